//! Slot editor — stages edits to one slot until an explicit save.
//!
//! DESIGN
//! ======
//! The editor owns a private copy of the slot. Nothing here touches the board
//! collection; the controller commits the value `save` returns. Size-class
//! rules depend on the configured `SchemaVersion`: the legacy rules forbid a
//! multi-cell size together with an icon, the current rules allow it.

use rand::Rng;
use serde::Serialize;

use crate::error::{ErrorCode, ErrorKind};
use crate::media;
use crate::services::slot::{AudioChannel, SchemaVersion, SizeClass, Slot, SlotError, SlotKey};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("no audio assigned to this slot")]
    NoAudio,
    #[error("size {0} cannot be combined with an icon")]
    IconSizeConflict(u32),
    #[error("audio entry {idx} out of range (entries: {len})")]
    AudioIndex { idx: usize, len: usize },
    #[error(transparent)]
    Slot(#[from] SlotError),
}

impl ErrorCode for EditorError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoAudio => "E_NO_AUDIO",
            Self::IconSizeConflict(_) => "E_VALIDATION",
            Self::AudioIndex { .. } => "E_INDEX_OUT_OF_RANGE",
            Self::Slot(e) => e.error_code(),
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::NoAudio | Self::IconSizeConflict(_) => ErrorKind::Validation,
            Self::AudioIndex { .. } => ErrorKind::IndexOutOfRange,
            Self::Slot(e) => e.kind(),
        }
    }
}

// =============================================================================
// VIEW
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeOption {
    pub code: u32,
    pub css_class: &'static str,
    pub selected: bool,
    /// Not selectable with the staged icon under legacy rules.
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioEntry {
    pub path: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorView {
    pub id: String,
    pub idx: usize,
    pub exists: bool,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub fa_icon: bool,
    pub sizes: Vec<SizeOption>,
    pub volume: f64,
    pub channel: AudioChannel,
    pub fade: Option<f64>,
    pub repeat: bool,
    pub audio: Vec<AudioEntry>,
}

// =============================================================================
// EDITOR
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SlotEditor {
    pub key: SlotKey,
    /// 1-based reading index, used as the fallback label.
    pub idx: usize,
    /// Whether the slot existed on the board when the editor opened.
    pub exists: bool,
    schema: SchemaVersion,
    staged: Slot,
}

impl SlotEditor {
    /// Open an editor on `existing`, or on an empty slot.
    #[must_use]
    pub fn open(key: SlotKey, idx: usize, existing: Option<&Slot>, schema: SchemaVersion) -> Self {
        Self {
            key,
            idx,
            exists: existing.is_some(),
            schema,
            staged: existing.cloned().unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn staged(&self) -> &Slot {
        &self.staged
    }

    pub fn set_name(&mut self, name: &str) {
        let name = name.trim();
        self.staged.name = (!name.is_empty()).then(|| name.to_string());
    }

    pub fn set_image_icon(&mut self, path: &str) {
        self.staged.icon = (!path.is_empty()).then(|| path.to_string());
        self.staged.fa_icon = Some(false);
    }

    pub fn set_font_icon(&mut self, class: &str) {
        self.staged.icon = (!class.is_empty()).then(|| class.to_string());
        self.staged.fa_icon = Some(true);
    }

    pub fn clear_icon(&mut self) {
        self.staged.icon = None;
        self.staged.fa_icon = None;
    }

    /// Stage a size class.
    ///
    /// # Errors
    ///
    /// Returns `Slot(UnknownSize)` for codes outside the table and
    /// `IconSizeConflict` for a multi-cell size on an icon slot under the
    /// legacy rules.
    pub fn set_size(&mut self, code: u32) -> Result<(), EditorError> {
        let class = SizeClass::lookup(code)?;
        if self.schema == SchemaVersion::Legacy && self.staged.icon.is_some() && class.is_multi_cell() {
            return Err(EditorError::IconSizeConflict(code));
        }
        self.staged.size = code;
        Ok(())
    }

    pub fn set_volume(&mut self, volume: f64) {
        if volume.is_finite() {
            self.staged.volume = volume.clamp(0.0, 1.0);
        }
    }

    /// Stage a fade in milliseconds. Non-finite or negative values clear it.
    pub fn set_fade(&mut self, fade: Option<f64>) {
        self.staged.fade = fade.filter(|f| f.is_finite() && *f >= 0.0);
    }

    pub fn set_channel(&mut self, channel: AudioChannel) {
        self.staged.channel = channel;
    }

    pub fn set_repeat(&mut self, repeat: bool) {
        self.staged.repeat = repeat;
    }

    /// Append an audio resource. Duplicates and empty paths are ignored.
    pub fn add_audio(&mut self, path: &str) {
        if !path.is_empty() && !self.staged.path.iter().any(|p| p == path) {
            self.staged.path.push(path.to_string());
        }
    }

    /// Remove the audio entry at `idx`.
    ///
    /// # Errors
    ///
    /// Returns `AudioIndex` for an index past the end.
    pub fn remove_audio(&mut self, idx: usize) -> Result<String, EditorError> {
        let len = self.staged.path.len();
        if idx >= len {
            return Err(EditorError::AudioIndex { idx, len });
        }
        Ok(self.staged.path.remove(idx))
    }

    /// Pick one staged path for an audition, the way a click would.
    pub fn preview_pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.staged.pick_path(rng)
    }

    /// Validate and return the slot to commit.
    ///
    /// # Errors
    ///
    /// Returns `NoAudio` if no audio resource is staged.
    pub fn save(&self) -> Result<Slot, EditorError> {
        if self.staged.path.is_empty() {
            return Err(EditorError::NoAudio);
        }
        let mut slot = self.staged.clone();
        slot.fade = slot.fade.filter(|f| f.is_finite() && *f >= 0.0);
        if self.schema == SchemaVersion::Legacy && slot.icon.is_some() {
            slot.size = 1;
        }
        Ok(slot.normalized())
    }

    #[must_use]
    pub fn view(&self) -> EditorView {
        let icon_locked = self.schema == SchemaVersion::Legacy && self.staged.icon.is_some();
        let sizes = SizeClass::all()
            .iter()
            .map(|class| SizeOption {
                code: class.code,
                css_class: class.css_class,
                selected: class.code == self.staged.size,
                disabled: icon_locked && class.is_multi_cell(),
            })
            .collect();

        EditorView {
            id: self.key.id(),
            idx: self.idx,
            exists: self.exists,
            name: self.staged.name.clone(),
            icon: self.staged.icon.clone(),
            fa_icon: self.staged.fa_icon.unwrap_or(false),
            sizes,
            volume: self.staged.volume,
            channel: self.staged.channel,
            fade: self.staged.fade,
            repeat: self.staged.repeat,
            audio: self
                .staged
                .path
                .iter()
                .map(|p| AudioEntry { path: p.clone(), name: media::pretty_media_name(p) })
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "editor_test.rs"]
mod tests;
