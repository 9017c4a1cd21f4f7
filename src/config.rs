use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

const MIN_OPACITY: f64 = 0.2;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Upper bound on the capture frame rate. Each mirror still clamps to
    /// the refresh rate of the display its source sits on.
    #[serde(default = "default_max_fps")]
    pub max_fps: u32,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Hovering a mirror raises and focuses the real window. When false the
    /// mirror activates on click instead.
    #[serde(default = "default_true")]
    pub forward_on_hover: bool,
    /// Stop the capture while interaction is forwarded to the source.
    #[serde(default = "default_true")]
    pub pause_on_hover: bool,
    /// Suppress mirrors that overlap the activated one's screen region.
    #[serde(default = "default_true")]
    pub avoidance: bool,
    /// Bundle identifiers that are never offered for pinning.
    #[serde(default)]
    pub blocklist: Vec<String>,
    /// Window title patterns to skip, e.g. menu bar extras.
    #[serde(default = "default_title_excludes")]
    pub title_excludes: Vec<String>,
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_max_fps() -> u32 {
    65535
}

fn default_opacity() -> f64 {
    1.0
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_true() -> bool {
    true
}

fn default_title_excludes() -> Vec<String> {
    vec!["^Item-0$".into()]
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_fps: default_max_fps(),
            opacity: default_opacity(),
            poll_interval_ms: default_poll_interval_ms(),
            forward_on_hover: default_true(),
            pause_on_hover: default_true(),
            avoidance: default_true(),
            blocklist: Vec::new(),
            title_excludes: default_title_excludes(),
            log_level: None,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        if config.opacity < MIN_OPACITY || config.opacity > 1.0 {
            tracing::warn!(
                opacity = config.opacity,
                "opacity outside {MIN_OPACITY}..=1.0, clamping"
            );
            config.opacity = config.opacity.clamp(MIN_OPACITY, 1.0);
        }
        Ok(config)
    }

    pub fn default_path() -> String {
        let home = std::env::var("HOME").unwrap_or_default();
        format!("{home}/.config/pintop/config.toml")
    }
}
