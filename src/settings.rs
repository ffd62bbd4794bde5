//! Settings store — the host's key-value persistence seam.
//!
//! DESIGN
//! ======
//! Everything this crate persists goes through `SettingsStore`: JSON values
//! by key, no transactions, last write wins. `MemorySettings` backs tests and
//! embedding hosts; `JsonFileSettings` keeps one pretty-printed JSON object
//! on disk for the CLI.
//!
//! The registry below lists every key with its default, so readers never
//! have to guess what an unset key means. Reads of unregistered keys fail.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::{ErrorCode, ErrorKind};

// =============================================================================
// REGISTRY
// =============================================================================

pub const SOUNDBOARDS: &str = "soundboards";
pub const ALLOW_PLAYERS: &str = "soundboards_allow_players";
pub const SOUNDPAD_CREATOR: &str = "soundpad_creator";
pub const SOUNDPAD_VOLUME: &str = "soundpad_volume";
pub const SOUNDPAD_HIDDEN_FILES: &str = "soundpad_hidden_files";
pub const SOUNDPAD_HIDE_CONTROLS: &str = "soundpad_hide_controls";

/// Value an unset key reads as, `None` for keys outside the registry.
///
/// `soundboards_allow_players` is world-scoped; every other key belongs to
/// the acting user.
#[must_use]
pub fn default_value(key: &str) -> Option<Value> {
    let value = match key {
        SOUNDBOARDS | SOUNDPAD_HIDDEN_FILES => Value::Object(Map::new()),
        ALLOW_PLAYERS => json!(true),
        SOUNDPAD_CREATOR => json!("tabletopaudio"),
        SOUNDPAD_VOLUME => json!(1.0),
        SOUNDPAD_HIDE_CONTROLS => json!(false),
        _ => return None,
    };
    Some(value)
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings json invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown setting: {0}")]
    UnknownKey(String),
}

impl ErrorCode for SettingsError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "E_SETTINGS_IO",
            Self::Json(_) => "E_SETTINGS_JSON",
            Self::UnknownKey(_) => "E_UNKNOWN_SETTING",
        }
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Storage
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

// =============================================================================
// STORE
// =============================================================================

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Stored value for `key`, `None` when unset.
    async fn get(&self, key: &str) -> Result<Option<Value>, SettingsError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), SettingsError>;
}

/// Read a key, falling back to its registry default.
///
/// # Errors
///
/// Returns `UnknownKey` for keys outside the registry and propagates store
/// failures.
pub async fn read_or_default(store: &dyn SettingsStore, key: &str) -> Result<Value, SettingsError> {
    let default = default_value(key).ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;
    Ok(store.get(key).await?.unwrap_or(default))
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, Value>>,
}

impl MemorySettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `values`.
    #[must_use]
    pub fn with_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self { values: RwLock::new(values.into_iter().collect()) }
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn get(&self, key: &str) -> Result<Option<Value>, SettingsError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        debug!(key, "settings set");
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by one JSON object in a file. A missing file reads as empty.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSettings {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    async fn load(&self) -> Result<Map<String, Value>, SettingsError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettings {
    async fn get(&self, key: &str) -> Result<Option<Value>, SettingsError> {
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.load().await?;
        all.insert(key.to_string(), value);
        let body = serde_json::to_string_pretty(&all)?;
        tokio::fs::write(&self.path, body).await?;
        debug!(key, path = %self.path.display(), "settings written");
        Ok(())
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
