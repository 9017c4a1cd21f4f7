mod action;
mod config;
mod core;
#[cfg(target_os = "macos")]
mod platform;

pub use action::Action;
pub use config::Config;
#[cfg(target_os = "macos")]
pub use platform::macos::{run_app, send_action};

#[cfg(not(target_os = "macos"))]
pub fn run_app(_config_path: Option<String>) -> anyhow::Result<()> {
    anyhow::bail!("window mirroring requires macOS")
}

#[cfg(not(target_os = "macos"))]
pub fn send_action(_action: &Action) -> anyhow::Result<String> {
    anyhow::bail!("window mirroring requires macOS")
}
