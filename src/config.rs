//! Soundboard configuration parsed from environment variables.

use std::time::Duration;

use crate::error::{ErrorCode, ErrorKind};
use crate::services::slot::SchemaVersion;

pub const DEFAULT_MAX_ROWS: usize = 30;
pub const DEFAULT_MAX_COLS: usize = 30;
pub const DEFAULT_ROWS: usize = 3;
pub const DEFAULT_COLS: usize = 10;
pub const DEFAULT_SETTINGS_PATH: &str = "soundboard-settings.json";
pub const DEFAULT_USER_NAME: &str = "Gamemaster";
pub const DEFAULT_RENDER_DELAY_MS: u64 = 100;
pub const DEFAULT_SOUNDPAD_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_PREVIEW_DELAY_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Parse(String),
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "E_CONFIG_PARSE",
        }
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Grid bounds and defaults for newly created boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLimits {
    pub max_rows: usize,
    pub max_cols: usize,
    pub default_rows: usize,
    pub default_cols: usize,
}

impl Default for GridLimits {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            max_cols: DEFAULT_MAX_COLS,
            default_rows: DEFAULT_ROWS,
            default_cols: DEFAULT_COLS,
        }
    }
}

impl GridLimits {
    /// Clamp a requested row count into `[1, max_rows]`.
    #[must_use]
    pub fn clamp_rows(&self, rows: i64) -> usize {
        clamp_dimension(rows, self.max_rows)
    }

    /// Clamp a requested column count into `[1, max_cols]`.
    #[must_use]
    pub fn clamp_cols(&self, cols: i64) -> usize {
        clamp_dimension(cols, self.max_cols)
    }
}

fn clamp_dimension(value: i64, max: usize) -> usize {
    let max = i64::try_from(max).unwrap_or(i64::MAX);
    usize::try_from(value.clamp(1, max)).unwrap_or(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundpadConfig {
    pub base_url: String,
    pub session: Option<String>,
    pub preview_delay: Duration,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundboardConfig {
    pub grid: GridLimits,
    pub schema: SchemaVersion,
    pub settings_path: String,
    pub user_name: String,
    pub is_gm: bool,
    pub render_delay: Duration,
    pub soundpad: SoundpadConfig,
}

impl Default for SoundboardConfig {
    fn default() -> Self {
        Self {
            grid: GridLimits::default(),
            schema: SchemaVersion::Current,
            settings_path: DEFAULT_SETTINGS_PATH.to_string(),
            user_name: DEFAULT_USER_NAME.to_string(),
            is_gm: true,
            render_delay: Duration::from_millis(DEFAULT_RENDER_DELAY_MS),
            soundpad: SoundpadConfig {
                base_url: DEFAULT_SOUNDPAD_BASE_URL.to_string(),
                session: None,
                preview_delay: Duration::from_millis(DEFAULT_PREVIEW_DELAY_MS),
                request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
                connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            },
        }
    }
}

impl SoundboardConfig {
    /// Build typed config from process environment variables.
    ///
    /// Optional:
    /// - `SOUNDBOARD_MAX_ROWS` / `SOUNDBOARD_MAX_COLS`: default 30
    /// - `SOUNDBOARD_DEFAULT_ROWS` / `SOUNDBOARD_DEFAULT_COLS`: default 3 / 10
    /// - `SOUNDBOARD_SCHEMA`: `current` (default) or `legacy`
    /// - `SOUNDBOARD_SETTINGS_PATH`: JSON settings file
    /// - `SOUNDBOARD_USER`, `SOUNDBOARD_IS_GM`: acting user
    /// - `SOUNDBOARD_RENDER_DELAY_MS`: default 100
    /// - `SOUNDPAD_BASE_URL`, `SOUNDPAD_SESSION`: remote index
    /// - `SOUNDPAD_PREVIEW_DELAY_MS`: default 1000
    /// - `SOUNDPAD_REQUEST_TIMEOUT_SECS` / `SOUNDPAD_CONNECT_TIMEOUT_SECS`: default 30 / 10
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for unknown enum values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for unknown enum values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_or = |key: &str, default: u64| -> u64 {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };
        let parse_usize = |key: &str, default: usize| -> usize {
            lookup(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(default)
        };

        let max_rows = parse_usize("SOUNDBOARD_MAX_ROWS", DEFAULT_MAX_ROWS).max(1);
        let max_cols = parse_usize("SOUNDBOARD_MAX_COLS", DEFAULT_MAX_COLS).max(1);
        let grid = GridLimits {
            max_rows,
            max_cols,
            default_rows: parse_usize("SOUNDBOARD_DEFAULT_ROWS", DEFAULT_ROWS).clamp(1, max_rows),
            default_cols: parse_usize("SOUNDBOARD_DEFAULT_COLS", DEFAULT_COLS).clamp(1, max_cols),
        };

        let schema = parse_schema(lookup("SOUNDBOARD_SCHEMA").as_deref())?;
        let is_gm = parse_bool(lookup("SOUNDBOARD_IS_GM").as_deref(), "SOUNDBOARD_IS_GM")?;

        let soundpad = SoundpadConfig {
            base_url: lookup("SOUNDPAD_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SOUNDPAD_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            session: lookup("SOUNDPAD_SESSION").filter(|s| !s.is_empty()),
            preview_delay: Duration::from_millis(parse_or("SOUNDPAD_PREVIEW_DELAY_MS", DEFAULT_PREVIEW_DELAY_MS)),
            request_timeout: Duration::from_secs(parse_or(
                "SOUNDPAD_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            connect_timeout: Duration::from_secs(parse_or(
                "SOUNDPAD_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
        };

        Ok(Self {
            grid,
            schema,
            settings_path: lookup("SOUNDBOARD_SETTINGS_PATH").unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string()),
            user_name: lookup("SOUNDBOARD_USER")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
            is_gm,
            render_delay: Duration::from_millis(parse_or("SOUNDBOARD_RENDER_DELAY_MS", DEFAULT_RENDER_DELAY_MS)),
            soundpad,
        })
    }
}

fn parse_schema(raw: Option<&str>) -> Result<SchemaVersion, ConfigError> {
    match raw.unwrap_or("current") {
        "current" => Ok(SchemaVersion::Current),
        "legacy" => Ok(SchemaVersion::Legacy),
        other => Err(ConfigError::Parse(format!(
            "unsupported SOUNDBOARD_SCHEMA '{other}' (expected 'current' or 'legacy')"
        ))),
    }
}

fn parse_bool(raw: Option<&str>, key: &str) -> Result<bool, ConfigError> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None | Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(ConfigError::Parse(format!("invalid boolean for {key}: {other}"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
