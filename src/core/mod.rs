mod arbiter;
mod capture;
mod directory;
mod engine;
mod geometry;
mod mirror;
mod picker;
mod resolver;
#[cfg(test)]
mod tests;
mod tracker;

#[cfg(target_os = "macos")]
pub(crate) use arbiter::MirrorId;
#[cfg(target_os = "macos")]
pub(crate) use capture::{CaptureCommand, StreamConfig};
#[cfg(target_os = "macos")]
pub(crate) use directory::{DirectorySnapshot, DisplayInfo, FilterPolicy, WindowId, WindowInfo};
#[cfg(target_os = "macos")]
pub(crate) use engine::{EffectBatch, Engine, EngineConfig};
#[cfg(target_os = "macos")]
pub(crate) use geometry::{Point, Rect};
#[cfg(target_os = "macos")]
pub(crate) use mirror::{Effect, MirrorEvent};
#[cfg(target_os = "macos")]
pub(crate) use picker::{Picker, PickerEffect};
#[cfg(target_os = "macos")]
pub(crate) use resolver::{ManipulationCandidate, resolve};
