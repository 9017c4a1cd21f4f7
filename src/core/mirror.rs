use super::arbiter::MirrorId;
use super::capture::{CaptureCommand, CaptureController, stream_config};
use super::directory::{DirectorySnapshot, DisplayId, WindowId};
use super::geometry::Rect;
use super::resolver::MAX_RESOLVE_ATTEMPTS;
use super::tracker::{GeometryTracker, TrackerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MirrorState {
    /// Surface created, waiting for the capture start to complete.
    Opening,
    Live,
    /// Following a source frame change; pointer logic is suppressed until
    /// the frame settles to avoid competing opacity/capture toggles.
    Resizing,
    /// User-paused: frozen content, ordered just above the source.
    Paused,
    /// Another mirror's activation region overlaps ours.
    Suppressed,
    /// Teardown requested; the owner drops the mirror after executing it.
    Closing,
}

/// Inputs from the platform layer and the engine. Tracker outcomes arrive
/// through [`PinnedMirror::tick`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MirrorEvent {
    CaptureStarted,
    CaptureFailed,
    PointerEntered,
    PointerLeft,
    Pause,
    Resume,
    AvoidanceChanged { suppressed: bool },
    HandleResolved { ok: bool },
}

/// Side effects for the platform layer, in execution order. The engine
/// consumes `ClaimActivation`/`ReleaseActivation` itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Effect {
    CreateSurface { frame: Rect },
    MoveSurface { frame: Rect },
    SetOpacity(f64),
    OrderAboveAll,
    OrderAboveSource,
    SetInteractive(bool),
    Capture(CaptureCommand),
    /// Look up the source's accessibility handle and reply with
    /// `HandleResolved`.
    ResolveHandle,
    /// Raise and focus the real source window.
    ActivateSource,
    ClaimActivation { frame: Rect },
    ReleaseActivation,
    CloseSurface,
}

pub(crate) struct PinnedMirror {
    id: MirrorId,
    source: WindowId,
    state: MirrorState,
    tracker: GeometryTracker,
    capture: CaptureController,
    frame: Rect,
    display: DisplayId,
    opacity: f64,
    fps_cap: u32,
    pause_on_hover: bool,
    /// Pointer is inside and interaction is forwarded to the source. Not a
    /// state of its own: the mirror stays `Live` while hidden.
    activated: bool,
    has_handle: bool,
    resolve_attempts: u8,
}

impl PinnedMirror {
    pub(crate) fn open(
        id: MirrorId,
        source: WindowId,
        frame: Rect,
        display: DisplayId,
        snapshot: &DirectorySnapshot,
        opacity: f64,
        fps_cap: u32,
        pause_on_hover: bool,
    ) -> (Self, Vec<Effect>) {
        let mut mirror = Self {
            id,
            source,
            state: MirrorState::Opening,
            tracker: GeometryTracker::new(source, frame, display),
            capture: CaptureController::new(),
            frame,
            display,
            opacity,
            fps_cap,
            pause_on_hover,
            activated: false,
            has_handle: false,
            resolve_attempts: 1,
        };
        let mut effects = vec![Effect::CreateSurface { frame }];
        if let Some(d) = snapshot.display(display)
            && let Some(cmd) = mirror.capture.start(stream_config(&frame, d, fps_cap))
        {
            effects.push(Effect::Capture(cmd));
        }
        effects.push(Effect::ResolveHandle);
        (mirror, effects)
    }

    pub(crate) fn id(&self) -> MirrorId {
        self.id
    }

    pub(crate) fn source(&self) -> WindowId {
        self.source
    }

    pub(crate) fn state(&self) -> MirrorState {
        self.state
    }

    pub(crate) fn frame(&self) -> Rect {
        self.frame
    }

    pub(crate) fn is_activated(&self) -> bool {
        self.activated
    }

    pub(crate) fn set_config(&mut self, opacity: f64, fps_cap: u32, pause_on_hover: bool) {
        self.opacity = opacity;
        self.fps_cap = fps_cap;
        self.pause_on_hover = pause_on_hover;
    }

    /// One geometry poll. Returns the effects to execute; an empty vec means
    /// the tick was quiet.
    pub(crate) fn tick(&mut self, snapshot: &DirectorySnapshot) -> Vec<Effect> {
        if self.state == MirrorState::Closing {
            return Vec::new();
        }
        let mut effects = Vec::new();
        match self.tracker.observe(snapshot) {
            TrackerEvent::Closed => return self.close(),
            TrackerEvent::Moved { frame, display, .. } => {
                self.follow(frame, display, snapshot, &mut effects);
            }
            TrackerEvent::Steady => {
                if self.state == MirrorState::Resizing {
                    self.state = MirrorState::Live;
                    effects.push(Effect::SetOpacity(self.opacity));
                }
            }
        }
        if !self.has_handle && self.resolve_attempts < MAX_RESOLVE_ATTEMPTS {
            self.resolve_attempts += 1;
            effects.push(Effect::ResolveHandle);
        }
        effects
    }

    fn follow(
        &mut self,
        frame: Rect,
        display: DisplayId,
        snapshot: &DirectorySnapshot,
        effects: &mut Vec<Effect>,
    ) {
        // A paused mirror stays put; the tracker keeps following so a later
        // resume picks up the current geometry.
        if self.state == MirrorState::Paused {
            self.frame = frame;
            self.display = display;
            return;
        }
        if self.state == MirrorState::Live && !self.activated {
            self.state = MirrorState::Resizing;
            effects.push(Effect::SetOpacity(0.0));
        }
        self.frame = frame;
        self.display = display;
        effects.push(Effect::MoveSurface { frame });
        if let Some(d) = snapshot.display(display)
            && let Some(cmd) = self
                .capture
                .update_size(stream_config(&frame, d, self.fps_cap))
        {
            effects.push(Effect::Capture(cmd));
        }
    }

    pub(crate) fn handle(&mut self, event: MirrorEvent) -> Vec<Effect> {
        if self.state == MirrorState::Closing {
            return Vec::new();
        }
        match event {
            MirrorEvent::CaptureStarted => {
                let mut effects = Vec::new();
                if self.state == MirrorState::Opening {
                    self.state = MirrorState::Live;
                    effects.push(Effect::SetOpacity(self.opacity));
                    effects.push(Effect::OrderAboveAll);
                }
                if let Some(cmd) = self.capture.started() {
                    effects.push(Effect::Capture(cmd));
                }
                effects
            }
            MirrorEvent::CaptureFailed => {
                self.capture.fail();
                self.close()
            }
            MirrorEvent::PointerEntered => {
                if self.state != MirrorState::Live || self.activated {
                    return Vec::new();
                }
                self.activated = true;
                let mut effects = vec![Effect::ActivateSource, Effect::SetOpacity(0.0)];
                if self.pause_on_hover
                    && let Some(cmd) = self.capture.pause()
                {
                    effects.push(Effect::Capture(cmd));
                }
                effects.push(Effect::ClaimActivation { frame: self.frame });
                effects
            }
            MirrorEvent::PointerLeft => {
                if !self.activated {
                    return Vec::new();
                }
                self.activated = false;
                let mut effects = vec![Effect::ReleaseActivation];
                if let Some(cmd) = self.capture.resume() {
                    effects.push(Effect::Capture(cmd));
                }
                effects.push(Effect::SetOpacity(self.opacity));
                effects
            }
            MirrorEvent::Pause => {
                if self.state != MirrorState::Live || self.activated {
                    return Vec::new();
                }
                self.state = MirrorState::Paused;
                let mut effects = Vec::new();
                if let Some(cmd) = self.capture.pause() {
                    effects.push(Effect::Capture(cmd));
                }
                effects.push(Effect::OrderAboveSource);
                effects
            }
            MirrorEvent::Resume => {
                if self.state != MirrorState::Paused {
                    return Vec::new();
                }
                self.state = MirrorState::Live;
                let mut effects = vec![Effect::MoveSurface { frame: self.frame }];
                if let Some(cmd) = self.capture.resume() {
                    effects.push(Effect::Capture(cmd));
                }
                effects.push(Effect::OrderAboveAll);
                effects.push(Effect::SetOpacity(self.opacity));
                effects
            }
            MirrorEvent::AvoidanceChanged { suppressed } => {
                if suppressed && self.state == MirrorState::Live && !self.activated {
                    self.state = MirrorState::Suppressed;
                    vec![Effect::SetInteractive(false), Effect::OrderAboveSource]
                } else if !suppressed && self.state == MirrorState::Suppressed {
                    self.state = MirrorState::Live;
                    vec![Effect::SetInteractive(true), Effect::OrderAboveAll]
                } else {
                    Vec::new()
                }
            }
            MirrorEvent::HandleResolved { ok } => {
                self.has_handle = ok;
                Vec::new()
            }
        }
    }

    /// Tear down: stop capture, give up the activation record, release the
    /// surface. Idempotent.
    pub(crate) fn close(&mut self) -> Vec<Effect> {
        if self.state == MirrorState::Closing {
            return Vec::new();
        }
        self.state = MirrorState::Closing;
        let mut effects = Vec::new();
        if let Some(cmd) = self.capture.stop() {
            effects.push(Effect::Capture(cmd));
        }
        if self.activated {
            self.activated = false;
            effects.push(Effect::ReleaseActivation);
        }
        effects.push(Effect::CloseSurface);
        effects
    }
}
