mod directory;
mod follow;
mod hover;

use crate::core::arbiter::MirrorId;
use crate::core::capture::CaptureCommand;
use crate::core::directory::{DirectorySnapshot, DisplayInfo, WindowInfo};
use crate::core::engine::{EffectBatch, Engine, EngineConfig};
use crate::core::geometry::Rect;
use crate::core::mirror::{Effect, MirrorEvent};

const OPACITY: f64 = 0.8;
const FPS_CAP: u32 = 60;

fn setup_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
    std::panic::set_hook(Box::new(|panic_info| {
        let backtrace = backtrace::Backtrace::new();
        tracing::error!("Application panicked: {panic_info}. Backtrace: {backtrace:?}");
    }));
}

pub(super) fn setup() -> Engine {
    setup_logger();
    Engine::new(EngineConfig {
        opacity: OPACITY,
        fps_cap: FPS_CAP,
        pause_on_hover: true,
        avoidance: true,
    })
}

pub(super) fn window(id: u32, frame: Rect) -> WindowInfo {
    WindowInfo {
        id,
        pid: 1000 + id as i32,
        title: Some(format!("window-{id}")),
        bundle_id: Some(format!("com.example.app{id}")),
        frame,
        alpha: 1.0,
        layer: 0,
    }
}

/// Two displays: a retina primary and a low-dpi secondary to its right.
pub(super) fn displays() -> Vec<DisplayInfo> {
    vec![
        DisplayInfo {
            id: 0,
            frame: Rect::new(0.0, 0.0, 1440.0, 900.0),
            max_fps: 120,
            scale: 2.0,
        },
        DisplayInfo {
            id: 1,
            frame: Rect::new(1440.0, 0.0, 1920.0, 1080.0),
            max_fps: 120,
            scale: 1.0,
        },
    ]
}

pub(super) fn desktop(windows: Vec<WindowInfo>) -> DirectorySnapshot {
    DirectorySnapshot::new(windows, displays())
}

/// Pin a window and walk it to `Live` with a resolved handle, so behavior
/// tests start from a settled mirror.
pub(super) fn pin_live(engine: &mut Engine, info: &WindowInfo, snapshot: &DirectorySnapshot) -> MirrorId {
    engine.toggle_pin(info, snapshot);
    let id = engine.mirror_for_source(info.id).unwrap();
    engine.handle(id, MirrorEvent::CaptureStarted);
    engine.handle(id, MirrorEvent::HandleResolved { ok: true });
    id
}

pub(super) fn effects(batch: &EffectBatch) -> String {
    batch
        .iter()
        .map(|(id, effect)| format!("{id} {}", fmt_effect(effect)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn fmt_effect(effect: &Effect) -> String {
    match effect {
        Effect::CreateSurface { frame } => format!("CreateSurface {frame}"),
        Effect::MoveSurface { frame } => format!("MoveSurface {frame}"),
        Effect::SetOpacity(opacity) => format!("SetOpacity {opacity:.2}"),
        Effect::OrderAboveAll => "OrderAboveAll".into(),
        Effect::OrderAboveSource => "OrderAboveSource".into(),
        Effect::SetInteractive(on) => format!("SetInteractive {on}"),
        Effect::Capture(CaptureCommand::Start(c)) => {
            format!("CaptureStart {}x{}@{}", c.width, c.height, c.fps)
        }
        Effect::Capture(CaptureCommand::Stop) => "CaptureStop".into(),
        Effect::Capture(CaptureCommand::Reconfigure(c)) => {
            format!("CaptureReconfigure {}x{}@{}", c.width, c.height, c.fps)
        }
        Effect::ResolveHandle => "ResolveHandle".into(),
        Effect::ActivateSource => "ActivateSource".into(),
        Effect::ClaimActivation { frame } => format!("ClaimActivation {frame}"),
        Effect::ReleaseActivation => "ReleaseActivation".into(),
        Effect::CloseSurface => "CloseSurface".into(),
    }
}
