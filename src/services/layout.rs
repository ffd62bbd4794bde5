//! Grid layout engine — board slot map to a renderable cell matrix.
//!
//! DESIGN
//! ======
//! `layout` walks the logical grid row by row. A slot spanning `k` columns
//! advances the column cursor by `k`, so the following `k - 1` logical cells
//! are never emitted; the container is expected to do real column spanning.
//! A span that runs past the end of a row is not clipped.
//!
//! `idx` is computed from the logical position, so numbering is stable across
//! resizes and spanned-over positions consume indices that are never shown.
//!
//! Playback state is not owned here. `PlayingTracker` holds the last known
//! playing flag per percent-decoded path and is joined into the view.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::config::GridLimits;
use crate::services::collection::Board;
use crate::services::slot::{Slot, SlotKey};

// =============================================================================
// VIEW TYPES
// =============================================================================

/// Render data for an occupied cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotView {
    pub slot: Slot,
    /// Button label: slot name or reading index.
    pub name: String,
    /// Columns occupied.
    pub span: usize,
    pub css_class: &'static str,
    pub playing: bool,
}

/// One emitted grid cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellView {
    /// `{row}#{col}`.
    pub id: String,
    pub key: SlotKey,
    /// 1-based reading-order index of the logical position.
    pub idx: usize,
    pub slot: Option<SlotView>,
}

impl CellView {
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        self.slot.as_ref().is_some_and(|s| s.slot.is_assigned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridView {
    pub rows: Vec<Vec<CellView>>,
    pub row_count: usize,
    pub col_count: usize,
    pub hide_unused: bool,
}

impl GridView {
    /// Cells to draw, honoring the hide-unused toggle.
    pub fn visible_cells(&self) -> impl Iterator<Item = &CellView> {
        self.rows
            .iter()
            .flatten()
            .filter(move |cell| !self.hide_unused || cell.is_assigned())
    }

    #[must_use]
    pub fn cell(&self, key: SlotKey) -> Option<&CellView> {
        self.rows.get(key.row)?.iter().find(|c| c.key == key)
    }
}

// =============================================================================
// LAYOUT
// =============================================================================

/// Lay out a board. `playing` holds percent-decoded paths currently playing.
#[must_use]
pub fn layout(board: &Board, limits: &GridLimits, playing: &HashSet<String>) -> GridView {
    let cols = board.effective_cols(limits);
    let rows = board.effective_rows(limits);

    let grid = (0..rows)
        .map(|row| {
            let mut cells = Vec::with_capacity(cols);
            let mut col = 0;
            while col < cols {
                let key = SlotKey::new(row, col);
                let idx = key.reading_index(cols);
                let slot = board.slot(key).map(|slot| slot_view(slot, idx, playing));
                col += slot.as_ref().map_or(1, |s| s.span.max(1));
                cells.push(CellView { id: key.id(), key, idx, slot });
            }
            cells
        })
        .collect();

    GridView { rows: grid, row_count: rows, col_count: cols, hide_unused: board.hide_unused.unwrap_or(false) }
}

fn slot_view(slot: &Slot, idx: usize, playing: &HashSet<String>) -> SlotView {
    SlotView {
        slot: slot.clone(),
        name: slot.display_name(idx),
        span: slot.span(),
        css_class: slot.css_class(),
        playing: slot.clean_paths().any(|p| playing.contains(&p)),
    }
}

// =============================================================================
// PLAYING TRACKER
// =============================================================================

/// Last known playing state of every path on the displayed board.
#[derive(Debug, Default)]
pub struct PlayingTracker {
    paths: HashMap<String, bool>,
    initialized: bool,
}

impl PlayingTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the board's paths and drop any no longer present on it.
    /// Known paths keep their state; new ones start as not playing.
    pub fn track_board(&mut self, board: &Board) {
        let current: HashSet<String> = board.slots.values().flat_map(Slot::clean_paths).collect();
        self.paths.retain(|path, _| current.contains(path));
        for path in current {
            self.paths.entry(path).or_insert(false);
        }
        self.initialized = true;
    }

    /// Whether a board has been tracked yet.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Record a playback transition. Returns `false` for untracked paths,
    /// which are ignored.
    pub fn update(&mut self, path: &str, playing: bool) -> bool {
        let clean = crate::media::clean_uri(path);
        match self.paths.get_mut(&clean) {
            Some(state) => {
                *state = playing;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_tracked(&self, path: &str) -> bool {
        self.paths.contains_key(&crate::media::clean_uri(path))
    }

    #[must_use]
    pub fn playing(&self) -> HashSet<String> {
        self.paths
            .iter()
            .filter(|(_, playing)| **playing)
            .map(|(path, _)| path.clone())
            .collect()
    }
}

#[cfg(test)]
#[path = "layout_test.rs"]
mod tests;
