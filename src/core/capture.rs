use super::directory::DisplayInfo;
use super::geometry::Rect;

/// Stream parameters derived from the tracked frame and the display it
/// overlaps. Pixel dimensions are frame points times the display's backing
/// scale; the frame rate is capped by both the user and the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StreamConfig {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) fps: u32,
}

pub(crate) fn stream_config(frame: &Rect, display: &DisplayInfo, fps_cap: u32) -> StreamConfig {
    StreamConfig {
        width: (frame.width * display.scale).round() as u32,
        height: (frame.height * display.scale).round() as u32,
        fps: fps_cap.min(display.max_fps),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CaptureState {
    Idle,
    Starting,
    Streaming,
    Paused,
    Stopped { failed: bool },
}

/// Instruction for the platform layer that owns the underlying stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CaptureCommand {
    Start(StreamConfig),
    Stop,
    Reconfigure(StreamConfig),
}

/// Lifecycle of one capture session, bound 1:1 to a pinned mirror.
///
/// `Idle -> Starting -> Streaming <-> Paused -> Stopped`. A failure at any
/// point lands in `Stopped { failed: true }`; the owner must close the
/// mirror, never retry. Methods return the command the platform layer has
/// to execute, or `None` when the call is a no-op in the current state.
#[derive(Debug)]
pub(crate) struct CaptureController {
    state: CaptureState,
    config: Option<StreamConfig>,
    /// Resize requested while a start was in flight, replayed on completion.
    pending: Option<StreamConfig>,
}

impl CaptureController {
    pub(crate) fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            config: None,
            pending: None,
        }
    }

    pub(crate) fn state(&self) -> CaptureState {
        self.state
    }

    pub(crate) fn config(&self) -> Option<StreamConfig> {
        self.config
    }

    pub(crate) fn start(&mut self, config: StreamConfig) -> Option<CaptureCommand> {
        if self.state != CaptureState::Idle {
            return None;
        }
        self.state = CaptureState::Starting;
        self.config = Some(config);
        Some(CaptureCommand::Start(config))
    }

    /// Async start completed. Ignored after a stop raced ahead of the
    /// completion handler. If the source was resized mid-start, the stream
    /// came up at a stale resolution and the latest one is replayed now.
    pub(crate) fn started(&mut self) -> Option<CaptureCommand> {
        if self.state != CaptureState::Starting {
            return None;
        }
        self.state = CaptureState::Streaming;
        let pending = self.pending.take()?;
        if Some(pending) == self.config {
            return None;
        }
        self.config = Some(pending);
        Some(CaptureCommand::Reconfigure(pending))
    }

    pub(crate) fn pause(&mut self) -> Option<CaptureCommand> {
        match self.state {
            CaptureState::Streaming | CaptureState::Starting => {
                if let Some(pending) = self.pending.take() {
                    self.config = Some(pending);
                }
                self.state = CaptureState::Paused;
                Some(CaptureCommand::Stop)
            }
            _ => None,
        }
    }

    /// Restart a paused session with its retained configuration.
    pub(crate) fn resume(&mut self) -> Option<CaptureCommand> {
        if self.state != CaptureState::Paused {
            return None;
        }
        let config = self.config?;
        self.state = CaptureState::Starting;
        Some(CaptureCommand::Start(config))
    }

    /// Adjust resolution and frame rate. A config identical to the current
    /// one is a no-op so recomputes are idempotent. While `Starting` the
    /// stream cannot reconfigure yet; the latest request is remembered and
    /// replayed by `started`.
    pub(crate) fn update_size(&mut self, config: StreamConfig) -> Option<CaptureCommand> {
        match self.state {
            CaptureState::Starting => {
                self.pending = (Some(config) != self.config).then_some(config);
                None
            }
            CaptureState::Streaming | CaptureState::Paused => {
                if self.config == Some(config) {
                    return None;
                }
                self.config = Some(config);
                Some(CaptureCommand::Reconfigure(config))
            }
            _ => None,
        }
    }

    pub(crate) fn fail(&mut self) {
        self.state = CaptureState::Stopped { failed: true };
    }

    pub(crate) fn stop(&mut self) -> Option<CaptureCommand> {
        let was_running = matches!(
            self.state,
            CaptureState::Starting | CaptureState::Streaming | CaptureState::Paused
        );
        if matches!(self.state, CaptureState::Stopped { .. }) {
            return None;
        }
        self.state = CaptureState::Stopped { failed: false };
        was_running.then_some(CaptureCommand::Stop)
    }
}
