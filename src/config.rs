//! Configuration from the `~/.ontrack/rc` file
//!
//! The rc file holds `key=value` lines; `#` starts a comment. Recognised keys:
//!
//! - `data.location`: flag database path, relative paths resolve against the
//!   rc file's directory
//! - `poll.interval_ms`: refresh tick for `ontrack watch`
//! - `selection.policy`: `respect-manual` or `follow-default`
//! - `color`: `auto`, `always` or `never`

use crate::error::TrackerError;
use crate::tracker::SelectionPolicy;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// When to emit ANSI colour codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(ColorMode::Auto),
            "always" => Some(ColorMode::Always),
            "never" => Some(ColorMode::Never),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_location: PathBuf,
    pub poll_interval: Duration,
    pub selection_policy: SelectionPolicy,
    pub color: ColorMode,
}

impl Config {
    /// Directory holding the rc file and, by default, the database
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Failed to determine home directory")?;
        Ok(home.join(".ontrack"))
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("rc"))
    }

    /// Get the default database path
    pub fn default_data_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("flags.db"))
    }

    fn with_data_location(data_location: PathBuf) -> Self {
        Self {
            data_location,
            poll_interval: DEFAULT_POLL_INTERVAL,
            selection_policy: SelectionPolicy::default(),
            color: ColorMode::default(),
        }
    }

    /// Load configuration from the rc file, or defaults if it does not exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let default_data = Self::default_data_path()?;

        if !config_path.exists() {
            log::debug!("No rc file at {}, using defaults", config_path.display());
            return Ok(Self::with_data_location(default_data));
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
        let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        let config = Self::parse(&contents, base_dir, default_data)?;
        Ok(config)
    }

    /// Parse rc file contents. `base_dir` anchors relative data locations.
    pub fn parse(contents: &str, base_dir: &Path, default_data: PathBuf) -> Result<Self, TrackerError> {
        let mut config = Self::with_data_location(default_data);

        for (idx, raw) in contents.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(TrackerError::InvalidConfig {
                    line: line_no,
                    message: format!("expected key=value, got '{}'", line),
                });
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "data.location" => {
                    let path = PathBuf::from(value);
                    config.data_location = if path.is_relative() {
                        base_dir.join(path)
                    } else {
                        path
                    };
                }
                "poll.interval_ms" => {
                    let ms: u64 = value.parse().ok().filter(|ms| *ms > 0).ok_or_else(|| {
                        TrackerError::InvalidConfig {
                            line: line_no,
                            message: format!("poll.interval_ms must be a positive integer, got '{}'", value),
                        }
                    })?;
                    config.poll_interval = Duration::from_millis(ms);
                }
                "selection.policy" => {
                    config.selection_policy = SelectionPolicy::from_str(value).ok_or_else(|| {
                        TrackerError::InvalidConfig {
                            line: line_no,
                            message: format!(
                                "selection.policy must be respect-manual or follow-default, got '{}'",
                                value
                            ),
                        }
                    })?;
                }
                "color" => {
                    config.color = ColorMode::from_str(value).ok_or_else(|| TrackerError::InvalidConfig {
                        line: line_no,
                        message: format!("color must be auto, always or never, got '{}'", value),
                    })?;
                }
                other => {
                    log::warn!("Ignoring unknown config key '{}' at line {}", other, line_no);
                }
            }
        }

        Ok(config)
    }
}
