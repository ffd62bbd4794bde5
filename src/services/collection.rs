//! Board collection manager — CRUD over a user's named boards.
//!
//! DESIGN
//! ======
//! The persisted value is a loose JSON blob. `migrate_if_legacy` is the one
//! decode boundary: it recognizes the pre-collection single-board shape,
//! wraps it, and repairs broken invariants (empty board list, dangling
//! `current`). Everything past that point works with typed values and plain
//! index arithmetic.
//!
//! Board indices are positional. Deleting a board shifts `current` by
//! position only; identity is not tracked across deletions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::GridLimits;
use crate::error::{ErrorCode, ErrorKind};
use crate::services::slot::{SLOT_KEY_PREFIX, Slot, SlotKey};

pub const MIN_BOARD_NAME_LEN: usize = 3;
pub const DEFAULT_BOARD_NAME: &str = "Default";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error("board name must be at least {MIN_BOARD_NAME_LEN} characters: {0:?}")]
    NameTooShort(String),
    #[error("board index {idx} out of range (boards: {len})")]
    IndexOutOfRange { idx: usize, len: usize },
    #[error("malformed board collection: {0}")]
    Malformed(String),
}

impl ErrorCode for CollectionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NameTooShort(_) => "E_VALIDATION",
            Self::IndexOutOfRange { .. } => "E_INDEX_OUT_OF_RANGE",
            Self::Malformed(_) => "E_MALFORMED_COLLECTION",
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::NameTooShort(_) => ErrorKind::Validation,
            Self::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Self::Malformed(_) => ErrorKind::Storage,
        }
    }
}

// =============================================================================
// BOARD
// =============================================================================

/// One named soundboard. Persisted flat: display fields and `audio-{r}#{c}`
/// slot keys share one JSON object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawBoard", into = "RawBoard")]
pub struct Board {
    pub name: Option<String>,
    pub cols: Option<usize>,
    pub rows: Option<usize>,
    pub hide_unused: Option<bool>,
    pub slots: BTreeMap<SlotKey, Slot>,
    /// Keys this crate does not interpret, carried through untouched.
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize)]
struct RawBoard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cols: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rows: Option<Value>,
    #[serde(rename = "hideUnused", default, skip_serializing_if = "Option::is_none")]
    hide_unused: Option<Value>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl From<RawBoard> for Board {
    fn from(raw: RawBoard) -> Self {
        let mut slots = BTreeMap::new();
        let mut extra = Map::new();
        for (key, value) in raw.rest {
            if key.starts_with(SLOT_KEY_PREFIX) {
                if let Ok(slot_key) = key.parse::<SlotKey>() {
                    slots.insert(slot_key, Slot::normalize(&value));
                    continue;
                }
                warn!(key = %key, "unparseable slot key kept as opaque data");
            }
            extra.insert(key, value);
        }

        Self {
            name: raw.name.as_ref().and_then(Value::as_str).map(str::to_string),
            cols: raw.cols.as_ref().and_then(as_dimension),
            rows: raw.rows.as_ref().and_then(as_dimension),
            hide_unused: raw.hide_unused.as_ref().and_then(Value::as_bool),
            slots,
            extra,
        }
    }
}

impl From<Board> for RawBoard {
    fn from(board: Board) -> Self {
        let mut rest = board.extra;
        for (key, slot) in board.slots {
            rest.insert(key.to_string(), serde_json::to_value(slot).unwrap_or(Value::Null));
        }
        Self {
            name: board.name.map(Value::String),
            cols: board.cols.map(Value::from),
            rows: board.rows.map(Value::from),
            hide_unused: board.hide_unused.map(Value::Bool),
            rest,
        }
    }
}

fn as_dimension(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl Board {
    /// A fresh board with the configured default grid.
    #[must_use]
    pub fn named(name: impl Into<String>, limits: &GridLimits) -> Self {
        Self {
            name: Some(name.into()),
            cols: Some(limits.default_cols),
            rows: Some(limits.default_rows),
            ..Self::default()
        }
    }

    /// Decode a board from loose JSON, normalizing every slot.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if the value is not an object.
    pub fn from_value(value: Value) -> Result<Self, CollectionError> {
        if !value.is_object() {
            return Err(CollectionError::Malformed(format!("board must be an object, got {value}")));
        }
        serde_json::from_value(value).map_err(|e| CollectionError::Malformed(e.to_string()))
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_BOARD_NAME)
    }

    /// Column count in `[1, max_cols]`, falling back to the configured default when unset.
    #[must_use]
    pub fn effective_cols(&self, limits: &GridLimits) -> usize {
        self.cols.unwrap_or(limits.default_cols).clamp(1, limits.max_cols.max(1))
    }

    /// Row count in `[1, max_rows]`, falling back to the configured default when unset.
    #[must_use]
    pub fn effective_rows(&self, limits: &GridLimits) -> usize {
        self.rows.unwrap_or(limits.default_rows).clamp(1, limits.max_rows.max(1))
    }

    /// Pull stored dimensions back into bounds. Returns whether anything changed.
    pub fn clamp_dimensions(&mut self, limits: &GridLimits) -> bool {
        let cols = self.cols.map(|_| self.effective_cols(limits));
        let rows = self.rows.map(|_| self.effective_rows(limits));
        let changed = cols != self.cols || rows != self.rows;
        self.cols = cols;
        self.rows = rows;
        changed
    }

    #[must_use]
    pub fn slot(&self, key: SlotKey) -> Option<&Slot> {
        self.slots.get(&key)
    }

    /// True when the key holds an assigned slot.
    #[must_use]
    pub fn is_assigned(&self, key: SlotKey) -> bool {
        self.slots.get(&key).is_some_and(Slot::is_assigned)
    }

    /// Resize display bounds. Slot data outside the new bounds is kept.
    pub fn resize(&mut self, rows: i64, cols: i64, limits: &GridLimits) {
        self.rows = Some(limits.clamp_rows(rows));
        self.cols = Some(limits.clamp_cols(cols));
    }
}

// =============================================================================
// COLLECTION
// =============================================================================

/// All boards of one user plus the active-board pointer.
///
/// Invariants: `boards` is never empty and `current < boards.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardCollection {
    pub boards: Vec<Board>,
    pub current: usize,
}

impl Default for BoardCollection {
    fn default() -> Self {
        Self { boards: vec![Board::default()], current: 0 }
    }
}

/// One row of the board picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardListEntry {
    pub name: String,
    pub idx: usize,
    pub selected: bool,
}

/// Decode the persisted value, migrating the legacy single-board shape.
///
/// Returns the collection and whether it differs from `raw` and must be
/// written back. Running this on its own serialized output returns `false`.
///
/// # Errors
///
/// Returns `Malformed` if the value is neither an object nor null, or if
/// `boards` holds a non-object entry.
pub fn migrate_if_legacy(raw: Value) -> Result<(BoardCollection, bool), CollectionError> {
    let mut obj = match raw {
        Value::Null => Map::new(),
        Value::Object(obj) => obj,
        other => return Err(CollectionError::Malformed(format!("expected object, got {other}"))),
    };

    let Some(boards_value) = obj.remove("boards") else {
        let board = Board::from_value(Value::Object(obj))?;
        info!(slots = board.slots.len(), "migrated legacy single-board soundboard");
        return Ok((BoardCollection { boards: vec![board], current: 0 }, true));
    };

    let Value::Array(items) = boards_value else {
        return Err(CollectionError::Malformed("`boards` must be an array".into()));
    };
    let mut boards = items
        .into_iter()
        .map(Board::from_value)
        .collect::<Result<Vec<_>, _>>()?;

    let mut repaired = false;
    if boards.is_empty() {
        warn!("board collection was empty; restoring default board");
        boards.push(Board { name: Some(DEFAULT_BOARD_NAME.into()), ..Board::default() });
        repaired = true;
    }

    let current = obj
        .get("current")
        .and_then(Value::as_u64)
        .and_then(|c| usize::try_from(c).ok());
    let current = match current {
        Some(c) if c < boards.len() => c,
        other => {
            warn!(current = ?other, boards = boards.len(), "current board pointer invalid; reset to 0");
            repaired = true;
            0
        }
    };

    Ok((BoardCollection { boards, current }, repaired))
}

impl BoardCollection {
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Clamp every board's stored grid into `limits`. Returns whether any board changed.
    pub fn clamp_dimensions(&mut self, limits: &GridLimits) -> bool {
        let mut changed = false;
        for (idx, board) in self.boards.iter_mut().enumerate() {
            if board.clamp_dimensions(limits) {
                warn!(board = idx, cols = ?board.cols, rows = ?board.rows, "board grid out of bounds; clamped");
                changed = true;
            }
        }
        changed
    }

    fn resolve(&self, board_idx: Option<usize>) -> Result<usize, CollectionError> {
        let idx = board_idx.unwrap_or(self.current);
        if idx < self.boards.len() {
            Ok(idx)
        } else {
            Err(CollectionError::IndexOutOfRange { idx, len: self.boards.len() })
        }
    }

    /// `boards[idx]`, or the current board when `idx` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` for an index past the end.
    pub fn current_board(&self, board_idx: Option<usize>) -> Result<&Board, CollectionError> {
        let idx = self.resolve(board_idx)?;
        Ok(&self.boards[idx])
    }

    /// Mutable access with the same index rules as `current_board`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` for an index past the end.
    pub fn current_board_mut(&mut self, board_idx: Option<usize>) -> Result<&mut Board, CollectionError> {
        let idx = self.resolve(board_idx)?;
        Ok(&mut self.boards[idx])
    }

    /// Overwrite a board in place. Does not move `current`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` for an index past the end.
    pub fn set_current_board(&mut self, board: Board, board_idx: Option<usize>) -> Result<(), CollectionError> {
        let idx = self.resolve(board_idx)?;
        self.boards[idx] = board;
        Ok(())
    }

    /// Append a new board and make it current.
    ///
    /// # Errors
    ///
    /// Returns `NameTooShort` for names under three characters.
    pub fn create_board(&mut self, name: &str, limits: &GridLimits) -> Result<usize, CollectionError> {
        validate_name(name)?;
        self.boards.push(Board::named(name, limits));
        self.current = self.boards.len() - 1;
        info!(board = self.current, name, "board created");
        Ok(self.current)
    }

    /// Delete a board. The last remaining board is reset to an empty
    /// `Default` board instead of being removed.
    ///
    /// When the removed index is at or before `current`, `current` moves back
    /// by one position. It never goes below zero.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` for an index past the end.
    pub fn delete_board(&mut self, board_idx: Option<usize>) -> Result<(), CollectionError> {
        let idx = self.resolve(board_idx)?;
        if self.boards.len() == 1 {
            self.boards[0] = Board { name: Some(DEFAULT_BOARD_NAME.into()), ..Board::default() };
            self.current = 0;
            info!("last board cleared");
            return Ok(());
        }

        self.boards.remove(idx);
        if idx <= self.current {
            self.current = self.current.saturating_sub(1);
        }
        info!(board = idx, current = self.current, "board deleted");
        Ok(())
    }

    /// Switch the active board.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` for an index past the end.
    pub fn select_board(&mut self, board_idx: usize) -> Result<(), CollectionError> {
        self.current = self.resolve(Some(board_idx))?;
        Ok(())
    }

    /// Board picker entries sorted by name. `idx` keeps the storage position.
    #[must_use]
    pub fn list_boards(&self) -> Vec<BoardListEntry> {
        let mut entries: Vec<BoardListEntry> = self
            .boards
            .iter()
            .enumerate()
            .map(|(idx, board)| BoardListEntry {
                name: board.display_name().to_string(),
                idx,
                selected: idx == self.current,
            })
            .collect();
        entries.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        entries
    }

    /// Rename a board.
    ///
    /// # Errors
    ///
    /// Returns `NameTooShort` or `IndexOutOfRange`.
    pub fn rename_board(&mut self, board_idx: Option<usize>, name: &str) -> Result<(), CollectionError> {
        validate_name(name)?;
        let board = self.current_board_mut(board_idx)?;
        board.name = Some(name.to_string());
        Ok(())
    }

    /// Resize a board's grid, clamping to `[1, MAX]`. Slot data is never dropped.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` for an index past the end.
    pub fn resize_board(
        &mut self,
        board_idx: Option<usize>,
        rows: i64,
        cols: i64,
        limits: &GridLimits,
    ) -> Result<(), CollectionError> {
        self.current_board_mut(board_idx)?.resize(rows, cols, limits);
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), CollectionError> {
    if name.chars().count() < MIN_BOARD_NAME_LEN {
        return Err(CollectionError::NameTooShort(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "collection_test.rs"]
mod tests;
