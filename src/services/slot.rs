//! Slot model — one grid cell's audio assignment.
//!
//! DESIGN
//! ======
//! A slot is decoded from whatever JSON the settings store hands back and is
//! normalized exactly once, at decode time, by `Slot::normalize`. Every
//! consumer downstream works with the typed, already-repaired value.
//!
//! Size classes map to a visual class and a merged column count through a
//! static table. Unknown classes are a configuration error; rendering callers
//! fall back to a single cell instead of failing the whole pass.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{ErrorCode, ErrorKind};
use crate::media;

pub const SLOT_KEY_PREFIX: &str = "audio-";
pub const DEFAULT_SIZE: u32 = 1;
pub const DEFAULT_VOLUME: f64 = 1.0;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("unknown size class: {0}")]
    UnknownSize(u32),
    #[error("invalid slot key: {0}")]
    InvalidKey(String),
}

impl ErrorCode for SlotError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownSize(_) => "E_UNKNOWN_SIZE",
            Self::InvalidKey(_) => "E_INVALID_SLOT_KEY",
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownSize(_) => ErrorKind::Configuration,
            Self::InvalidKey(_) => ErrorKind::Validation,
        }
    }
}

/// Which set of size-class rules applies.
///
/// `Legacy` forbids multi-cell slots that carry an icon; `Current` allows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    Legacy,
    #[default]
    Current,
}

/// Host playback channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioChannel {
    Music,
    #[default]
    Environment,
    Interface,
}

impl FromStr for AudioChannel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "music" => Ok(Self::Music),
            "environment" => Ok(Self::Environment),
            "interface" => Ok(Self::Interface),
            _ => Err(()),
        }
    }
}

impl fmt::Display for AudioChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Music => "music",
            Self::Environment => "environment",
            Self::Interface => "interface",
        })
    }
}

// =============================================================================
// SIZE CLASSES
// =============================================================================

/// One row of the size-class table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeClass {
    pub code: u32,
    pub css_class: &'static str,
    /// Grid columns the slot occupies.
    pub merged: usize,
    /// Grid rows the slot is drawn over. Informational only.
    pub tall: usize,
}

const SIZE_TABLE: [SizeClass; 9] = [
    SizeClass { code: 1, css_class: "size1", merged: 1, tall: 1 },
    SizeClass { code: 2, css_class: "size2", merged: 2, tall: 1 },
    SizeClass { code: 3, css_class: "size3", merged: 3, tall: 1 },
    SizeClass { code: 12, css_class: "size12", merged: 1, tall: 2 },
    SizeClass { code: 13, css_class: "size13", merged: 1, tall: 3 },
    SizeClass { code: 22, css_class: "size22", merged: 2, tall: 2 },
    SizeClass { code: 23, css_class: "size23", merged: 2, tall: 3 },
    SizeClass { code: 32, css_class: "size32", merged: 3, tall: 2 },
    SizeClass { code: 33, css_class: "size33", merged: 3, tall: 3 },
];

impl SizeClass {
    /// Look up a size class by its code.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSize` if the code is not in the table.
    pub fn lookup(code: u32) -> Result<Self, SlotError> {
        SIZE_TABLE
            .iter()
            .find(|s| s.code == code)
            .copied()
            .ok_or(SlotError::UnknownSize(code))
    }

    /// Whether this class spans more than one cell in any direction.
    #[must_use]
    pub fn is_multi_cell(self) -> bool {
        self.merged > 1 || self.tall > 1
    }

    #[must_use]
    pub fn all() -> &'static [SizeClass] {
        &SIZE_TABLE
    }
}

/// Number of grid columns a slot of the given size class occupies.
///
/// # Errors
///
/// Returns `UnknownSize` for codes outside the table.
pub fn size_to_span(size: u32) -> Result<usize, SlotError> {
    SizeClass::lookup(size).map(|s| s.merged)
}

// =============================================================================
// SLOT KEY
// =============================================================================

/// Grid address of a slot, persisted as `audio-{row}#{col}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    pub row: usize,
    pub col: usize,
}

impl SlotKey {
    #[must_use]
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Short `{row}#{col}` form used as the cell id in views.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}#{}", self.row, self.col)
    }

    /// Parse the short `{row}#{col}` form. Only the canonical spelling is
    /// accepted, so every key maps back to exactly one string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if the id is not two `#`-separated decimal
    /// integers without sign, padding or leading zeros.
    pub fn from_id(id: &str) -> Result<Self, SlotError> {
        let invalid = || SlotError::InvalidKey(id.to_string());
        let (row, col) = id.split_once('#').ok_or_else(invalid)?;
        let row = parse_coordinate(row).ok_or_else(invalid)?;
        let col = parse_coordinate(col).ok_or_else(invalid)?;
        Ok(Self { row, col })
    }

    /// 1-based reading-order index for a grid of `cols` columns.
    #[must_use]
    pub fn reading_index(&self, cols: usize) -> usize {
        1 + self.row * cols + self.col
    }
}

fn parse_coordinate(raw: &str) -> Option<usize> {
    let canonical = raw.bytes().all(|b| b.is_ascii_digit()) && (raw == "0" || !raw.starts_with('0'));
    if canonical { raw.parse().ok() } else { None }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SLOT_KEY_PREFIX}{}#{}", self.row, self.col)
    }
}

impl Serialize for SlotKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for SlotKey {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .strip_prefix(SLOT_KEY_PREFIX)
            .ok_or_else(|| SlotError::InvalidKey(s.to_string()))?;
        Self::from_id(id).map_err(|_| SlotError::InvalidKey(s.to_string()))
    }
}

// =============================================================================
// SLOT
// =============================================================================

/// One cell's assignment. Always decoded through `Slot::normalize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Slot {
    pub path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(rename = "faIcon", skip_serializing_if = "Option::is_none")]
    pub fa_icon: Option<bool>,
    pub size: u32,
    pub volume: f64,
    pub channel: AudioChannel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fade: Option<f64>,
    pub repeat: bool,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            path: Vec::new(),
            name: None,
            icon: None,
            fa_icon: None,
            size: DEFAULT_SIZE,
            volume: DEFAULT_VOLUME,
            channel: AudioChannel::default(),
            fade: None,
            repeat: false,
        }
    }
}

impl From<Value> for Slot {
    fn from(raw: Value) -> Self {
        Self::normalize(&raw)
    }
}

impl Slot {
    /// Build a slot holding a single audio resource.
    #[must_use]
    pub fn with_path(path: impl Into<String>) -> Self {
        Self { path: vec![path.into()], ..Self::default() }
    }

    /// Normalize an arbitrary decoded-JSON value into a slot.
    ///
    /// - `path` is always an array; a bare string becomes a one-element array
    /// - `volume` defaults to 1.0 when absent, zero, or not a number
    /// - `fade` is dropped unless it is a finite, non-negative number
    /// - `size` defaults to 1 when absent
    #[must_use]
    pub fn normalize(raw: &Value) -> Self {
        let Some(obj) = raw.as_object() else {
            return Self::default();
        };

        let path = match obj.get("path") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::String(p)) if !p.is_empty() => vec![p.clone()],
            _ => Vec::new(),
        };

        let non_empty = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let size = obj
            .get("size")
            .and_then(as_number)
            .filter(|n| n.fract() == 0.0 && *n >= 1.0 && *n <= f64::from(u32::MAX))
            .map_or(DEFAULT_SIZE, |n| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let size = n as u32;
                size
            });

        let volume = obj
            .get("volume")
            .and_then(as_number)
            .filter(|v| v.is_finite() && *v > 0.0)
            .map_or(DEFAULT_VOLUME, |v| v.min(1.0));

        let channel = match obj.get("channel").and_then(Value::as_str) {
            None => AudioChannel::default(),
            Some(raw) => raw.parse().unwrap_or_else(|()| {
                warn!(channel = raw, "unknown playback channel; using default");
                AudioChannel::default()
            }),
        };

        let fade = obj
            .get("fade")
            .and_then(as_number)
            .filter(|f| f.is_finite() && *f >= 0.0);

        Self {
            path,
            name: non_empty("name"),
            icon: non_empty("icon"),
            fa_icon: obj.get("faIcon").and_then(Value::as_bool),
            size,
            volume,
            channel,
            fade,
            repeat: obj.get("repeat").and_then(Value::as_bool).unwrap_or(false),
        }
    }

    /// Re-apply normalization to an already typed slot.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self::normalize(&serde_json::to_value(&self).unwrap_or(Value::Null))
    }

    #[must_use]
    pub fn is_assigned(&self) -> bool {
        !self.path.is_empty()
    }

    /// Columns occupied in the grid, treating unknown classes as one cell.
    #[must_use]
    pub fn span(&self) -> usize {
        size_to_span(self.size).unwrap_or_else(|e| {
            warn!(error = %e, "slot size class not in table; rendering as one cell");
            1
        })
    }

    /// CSS class for the slot's size, `size1` for unknown classes.
    #[must_use]
    pub fn css_class(&self) -> &'static str {
        SizeClass::lookup(self.size).map_or("size1", |s| s.css_class)
    }

    /// Label shown on the button: the name, or the reading index.
    #[must_use]
    pub fn display_name(&self, idx: usize) -> String {
        self.name.clone().unwrap_or_else(|| idx.to_string())
    }

    /// Percent-decoded paths, used to join against playback state.
    pub fn clean_paths(&self) -> impl Iterator<Item = String> + '_ {
        self.path.iter().map(|p| media::clean_uri(p))
    }

    /// Pick one path uniformly at random. `None` for an unassigned slot.
    pub fn pick_path<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        match self.path.len() {
            0 => None,
            1 => Some(self.path[0].as_str()),
            n => Some(self.path[rng.random_range(0..n)].as_str()),
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[path = "slot_test.rs"]
mod tests;
