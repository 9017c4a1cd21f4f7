use std::collections::HashMap;

use dispatch2::{DispatchQueue, DispatchQueueAttr, DispatchRetained};
use objc2::MainThreadMarker;
use objc2_app_kit::NSEvent;
use objc2_foundation::{NSPoint, NSRect, NSSize};
use regex::Regex;
use tracing::{debug, warn};

use crate::action::Action;
use crate::config::Config;
use crate::core::{
    CaptureCommand, DirectorySnapshot, Effect, EffectBatch, Engine, EngineConfig, FilterPolicy,
    MirrorEvent, MirrorId, PickerEffect, Point, Rect, StreamConfig, WindowInfo,
};

use super::accessibility::SourceWindow;
use super::app::{AppEvent, EventSender};
use super::capture::{WindowCapture, create_capture_async};
use super::picker::PickerSession;
use super::screens;
use super::surface::MirrorSurface;
use super::window_list;

/// Main-thread owner of the engine and everything it drives: surfaces,
/// capture streams, accessibility handles, the picker. Events arrive from
/// the run loop source one at a time; effects are executed synchronously.
pub(super) struct Runtime {
    mtm: MainThreadMarker,
    config: Config,
    policy: FilterPolicy,
    engine: Engine,
    snapshot: DirectorySnapshot,
    primary_height: f64,
    surfaces: HashMap<MirrorId, MirrorSurface>,
    captures: HashMap<MirrorId, WindowCapture>,
    /// Stream parameters for captures whose SCStream is still being built.
    pending_start: HashMap<MirrorId, StreamConfig>,
    handles: HashMap<MirrorId, SourceWindow>,
    /// Window-list entry of each mirror's source as of pin time.
    sources: HashMap<MirrorId, WindowInfo>,
    picker: Option<PickerSession>,
    capture_queue: DispatchRetained<DispatchQueue>,
    sender: EventSender,
}

impl Runtime {
    pub(super) fn new(mtm: MainThreadMarker, config: Config, sender: EventSender) -> Self {
        let policy = build_policy(&config);
        let engine = Engine::new(engine_config(&config));
        let mut runtime = Self {
            mtm,
            config,
            policy,
            engine,
            snapshot: DirectorySnapshot::default(),
            primary_height: 0.0,
            surfaces: HashMap::new(),
            captures: HashMap::new(),
            pending_start: HashMap::new(),
            handles: HashMap::new(),
            sources: HashMap::new(),
            picker: None,
            capture_queue: DispatchQueue::new("pintop.capture", DispatchQueueAttr::SERIAL),
            sender,
        };
        runtime.refresh();
        runtime
    }

    pub(super) fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Poll => {
                self.refresh();
                let batch = self.engine.tick(&self.snapshot);
                self.run_batch(batch);
            }
            AppEvent::Action(action) => self.handle_action(action),
            AppEvent::ConfigReloaded(config) => {
                if config.poll_interval_ms != self.config.poll_interval_ms {
                    tracing::warn!("poll_interval_ms changes take effect on the next launch");
                }
                self.policy = build_policy(&config);
                let batch = self.engine.set_config(engine_config(&config));
                self.config = config;
                self.run_batch(batch);
            }
            AppEvent::CaptureReady { mirror, capture } => {
                // The mirror may have closed while the stream was built.
                if self.engine.mirror(mirror).is_none() {
                    return;
                }
                let mut capture = capture;
                if let Some(config) = self.pending_start.remove(&mirror) {
                    capture.start(config, mirror, self.sender.clone());
                }
                self.captures.insert(mirror, capture);
            }
            AppEvent::CaptureStarted { mirror } => {
                let batch = self.engine.handle(mirror, MirrorEvent::CaptureStarted);
                self.run_batch(batch);
            }
            AppEvent::CaptureFailed { mirror } => {
                warn!(%mirror, "capture failed, closing mirror");
                let batch = self.engine.handle(mirror, MirrorEvent::CaptureFailed);
                self.run_batch(batch);
            }
            AppEvent::Frame { mirror, surface } => {
                // Frames for mirrors closed in flight land here and are
                // dropped.
                if let Some(s) = self.surfaces.get_mut(&mirror) {
                    s.apply_frame(&surface);
                }
            }
            AppEvent::PointerEntered { mirror } => {
                if self.config.forward_on_hover {
                    let batch = self.engine.handle(mirror, MirrorEvent::PointerEntered);
                    self.run_batch(batch);
                }
            }
            AppEvent::PointerExited { mirror } => {
                let batch = self.engine.handle(mirror, MirrorEvent::PointerLeft);
                self.run_batch(batch);
            }
            AppEvent::SurfaceClicked { mirror } => {
                if !self.config.forward_on_hover {
                    let batch = self.engine.handle(mirror, MirrorEvent::PointerEntered);
                    self.run_batch(batch);
                }
            }
            AppEvent::PickerMoved => self.picker_moved(),
            AppEvent::PickerClicked => self.picker_clicked(),
            AppEvent::PickerCancelled => {
                self.picker = None;
            }
            // Handled by the delegate before the runtime sees events.
            AppEvent::Shutdown => {}
        }
    }

    /// Close every mirror and release their streams before the app exits.
    pub(super) fn shutdown(&mut self) {
        let batch = self.engine.unpin_all();
        self.run_batch(batch);
        self.picker = None;
    }

    fn refresh(&mut self) {
        self.snapshot = window_list::snapshot(self.mtm);
        self.primary_height = screens::primary_full_height();
    }

    fn handle_action(&mut self, action: Action) {
        debug!(?action, "handling action");
        match action {
            Action::Pick => {
                if self.picker.is_none() {
                    self.refresh();
                    self.picker = Some(PickerSession::start(self.mtm, self.sender.clone()));
                }
            }
            Action::Pin { title } => {
                self.refresh();
                match self.snapshot.find_by_title(&title, &self.policy).cloned() {
                    Some(window) => self.toggle_pin(&window),
                    None => warn!(title, "no eligible window with this title"),
                }
            }
            Action::Unpin { title } => match self.mirror_by_title(&title) {
                Some(mirror) => {
                    let batch = self.engine.unpin(mirror);
                    self.run_batch(batch);
                }
                None => warn!(title, "no mirror of a window with this title"),
            },
            Action::UnpinAll => {
                let batch = self.engine.unpin_all();
                self.run_batch(batch);
            }
            Action::Pause { title } => match self.mirror_by_title(&title) {
                Some(mirror) => {
                    let batch = self.engine.handle(mirror, MirrorEvent::Pause);
                    self.run_batch(batch);
                }
                None => warn!(title, "no mirror of a window with this title"),
            },
            Action::Resume { title } => match self.mirror_by_title(&title) {
                Some(mirror) => {
                    let batch = self.engine.handle(mirror, MirrorEvent::Resume);
                    self.run_batch(batch);
                }
                None => warn!(title, "no mirror of a window with this title"),
            },
            Action::Exit => self.sender.send(AppEvent::Shutdown),
        }
    }

    fn toggle_pin(&mut self, window: &WindowInfo) {
        let batch = self.engine.toggle_pin(window, &self.snapshot);
        if let Some(mirror) = self.engine.mirror_for_source(window.id) {
            self.sources.insert(mirror, window.clone());
        }
        self.run_batch(batch);
    }

    fn mirror_by_title(&self, title: &str) -> Option<MirrorId> {
        self.sources
            .iter()
            .find(|(_, w)| w.title.as_deref() == Some(title))
            .map(|(mirror, _)| *mirror)
    }

    fn run_batch(&mut self, batch: EffectBatch) {
        for (mirror, effect) in batch {
            self.run_effect(mirror, effect);
        }
    }

    fn run_effect(&mut self, mirror: MirrorId, effect: Effect) {
        match effect {
            Effect::CreateSurface { frame } => {
                let Some(source) = self.engine.mirror(mirror).map(|m| m.source()) else {
                    return;
                };
                let scale = self
                    .snapshot
                    .display_for(&frame)
                    .map(|d| d.scale)
                    .unwrap_or(1.0);
                let surface = MirrorSurface::new(
                    self.mtm,
                    mirror,
                    source,
                    to_ns_rect(frame, self.primary_height),
                    scale,
                    self.sender.clone(),
                );
                self.surfaces.insert(mirror, surface);
            }
            Effect::MoveSurface { frame } => {
                if let Some(surface) = self.surfaces.get(&mirror) {
                    surface.set_frame(to_ns_rect(frame, self.primary_height));
                    if let Some(display) = self.snapshot.display_for(&frame) {
                        surface.set_scale(display.scale);
                    }
                }
            }
            Effect::SetOpacity(opacity) => {
                if let Some(surface) = self.surfaces.get(&mirror) {
                    surface.set_opacity(opacity);
                }
            }
            Effect::OrderAboveAll => {
                if let Some(surface) = self.surfaces.get(&mirror) {
                    surface.order_above_all();
                }
            }
            Effect::OrderAboveSource => {
                if let Some(surface) = self.surfaces.get(&mirror) {
                    surface.order_above_source();
                }
            }
            Effect::SetInteractive(interactive) => {
                if let Some(surface) = self.surfaces.get(&mirror) {
                    surface.set_interactive(interactive);
                }
            }
            Effect::Capture(command) => self.run_capture_command(mirror, command),
            Effect::ResolveHandle => self.resolve_handle(mirror),
            Effect::ActivateSource => match self.handles.get(&mirror) {
                Some(handle) => {
                    if let Err(e) = handle.activate() {
                        debug!(%mirror, "failed to activate source: {e:#}");
                    }
                }
                None => debug!(%mirror, "no accessibility handle, cannot activate source"),
            },
            Effect::CloseSurface => {
                self.surfaces.remove(&mirror);
                self.captures.remove(&mirror);
                self.pending_start.remove(&mirror);
                self.handles.remove(&mirror);
                self.sources.remove(&mirror);
            }
            // Consumed inside the engine, never emitted to the platform.
            Effect::ClaimActivation { .. } | Effect::ReleaseActivation => {}
        }
    }

    fn run_capture_command(&mut self, mirror: MirrorId, command: CaptureCommand) {
        match command {
            CaptureCommand::Start(config) => match self.captures.get_mut(&mirror) {
                Some(capture) => capture.start(config, mirror, self.sender.clone()),
                None => {
                    let Some(source) = self.engine.mirror(mirror).map(|m| m.source()) else {
                        return;
                    };
                    self.pending_start.insert(mirror, config);
                    create_capture_async(
                        mirror,
                        source,
                        self.sender.clone(),
                        self.capture_queue.clone(),
                    );
                }
            },
            CaptureCommand::Stop => {
                if let Some(capture) = self.captures.get_mut(&mirror) {
                    capture.stop();
                }
            }
            CaptureCommand::Reconfigure(config) => {
                if let Some(capture) = self.captures.get_mut(&mirror) {
                    capture.reconfigure(config);
                }
            }
        }
    }

    fn resolve_handle(&mut self, mirror: MirrorId) {
        let Some(frame) = self.engine.mirror(mirror).map(|m| m.frame()) else {
            return;
        };
        let Some(source) = self.sources.get(&mirror) else {
            return;
        };
        // The tracked frame is fresher than the pin-time entry.
        let mut target = source.clone();
        target.frame = frame;
        let ok = match SourceWindow::lookup(&target) {
            Some(handle) => {
                self.handles.insert(mirror, handle);
                true
            }
            None => false,
        };
        let batch = self
            .engine
            .handle(mirror, MirrorEvent::HandleResolved { ok });
        self.run_batch(batch);
    }

    fn picker_moved(&mut self) {
        let Some(session) = self.picker.as_mut() else {
            return;
        };
        let location = unsafe { NSEvent::mouseLocation() };
        let point = Point {
            x: location.x,
            y: self.primary_height - location.y,
        };
        match session
            .hit_test
            .pointer_moved(point, &self.snapshot, &self.policy)
        {
            Some(PickerEffect::Highlight { frame, .. }) => {
                session.set_highlight(to_ns_rect(frame, self.primary_height));
            }
            Some(PickerEffect::ClearHighlight) => session.clear_highlight(),
            None => {}
        }
    }

    fn picker_clicked(&mut self) {
        let Some(mut session) = self.picker.take() else {
            return;
        };
        self.refresh();
        let confirmed = session.hit_test.confirm(&self.snapshot, &self.policy);
        drop(session);
        match confirmed {
            Some(window) => self.toggle_pin(&window),
            None => debug!("picked window vanished before the click landed"),
        }
    }
}

fn engine_config(config: &Config) -> EngineConfig {
    EngineConfig {
        opacity: config.opacity,
        fps_cap: config.max_fps,
        pause_on_hover: config.pause_on_hover,
        avoidance: config.avoidance,
    }
}

fn build_policy(config: &Config) -> FilterPolicy {
    let title_excludes = config
        .title_excludes
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(pattern, "invalid title exclude pattern: {e}");
                None
            }
        })
        .collect();
    FilterPolicy::new(
        config.blocklist.clone(),
        title_excludes,
        Some(std::process::id() as i32),
    )
}

/// Window-server rects are top-left origin; AppKit wants bottom-left,
/// relative to the primary display.
fn to_ns_rect(frame: Rect, primary_height: f64) -> NSRect {
    let flipped = frame.flipped(primary_height);
    NSRect::new(
        NSPoint::new(flipped.x, flipped.y),
        NSSize::new(flipped.width, flipped.height),
    )
}
