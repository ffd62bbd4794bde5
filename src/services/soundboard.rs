//! Soundboard controller — commands in, outcomes out.
//!
//! DESIGN
//! ======
//! Every user interaction arrives as a `Command`. Mutating commands follow
//! the same shape: read the collection from settings (migrating on the way),
//! mutate, persist, and return a fresh `Outcome::Render`. There is no
//! optimistic concurrency; two writers on the same key race and the last
//! write wins.
//!
//! The controller never touches a view. It describes what the caller should
//! show next: a render, a notice, a confirmation prompt, an editor, or an
//! export file.
//!
//! ERROR HANDLING
//! ==============
//! `dispatch` returns the raw `Result`. `handle` maps failures to a notice by
//! `ErrorKind`: validation and configuration problems become warnings, the
//! rest become errors. A failed command never leaves a partial write behind
//! because the single `set` happens last.

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, broadcast};
use tracing::{error, info, warn};

use crate::config::GridLimits;
use crate::error::{ErrorCode, ErrorKind};
use crate::playback::{PlayOptions, PlaybackError, PlaybackEvent};
use crate::services::collection::{Board, BoardCollection, BoardListEntry, CollectionError, migrate_if_legacy};
use crate::services::editor::{EditorError, SlotEditor};
use crate::services::layout::{GridView, PlayingTracker, layout};
use crate::services::slot::{SchemaVersion, Slot, SlotError, SlotKey};
use crate::settings::{self, SettingsError};
use crate::state::AppContext;

/// Version stamped into export documents.
pub const EXPORT_SCHEMA_VERSION: u64 = 2;
pub const SCHEMA_VERSION_KEY: &str = "schemaVersion";
const LEGACY_EXPORT_PREFIX: &str = "fav";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SoundboardError {
    #[error("not authorized to use the soundboard")]
    Unauthorized,
    #[error("slot {0} is not assigned")]
    SlotNotAssigned(SlotKey),
    #[error("slot {0} is already assigned")]
    SlotExists(SlotKey),
    #[error("invalid import: {0}")]
    InvalidImport(String),
    #[error(transparent)]
    Collection(#[from] CollectionError),
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Slot(#[from] SlotError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

impl ErrorCode for SoundboardError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "E_UNAUTHORIZED",
            Self::SlotNotAssigned(_) => "E_SLOT_NOT_ASSIGNED",
            Self::SlotExists(_) => "E_SLOT_EXISTS",
            Self::InvalidImport(_) => "E_INVALID_IMPORT",
            Self::Collection(e) => e.error_code(),
            Self::Editor(e) => e.error_code(),
            Self::Slot(e) => e.error_code(),
            Self::Settings(e) => e.error_code(),
            Self::Playback(e) => e.error_code(),
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized => ErrorKind::Authorization,
            Self::SlotNotAssigned(_) | Self::SlotExists(_) | Self::InvalidImport(_) => ErrorKind::Validation,
            Self::Collection(e) => e.kind(),
            Self::Editor(e) => e.kind(),
            Self::Slot(e) => e.kind(),
            Self::Settings(e) => e.kind(),
            Self::Playback(e) => e.kind(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Settings(e) => e.retryable(),
            _ => false,
        }
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Answer to the overwrite-or-swap prompt for a drop on an assigned slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropResolution {
    Overwrite,
    Swap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope {
    Board,
    Collection,
}

/// An audio asset dragged in from outside the soundboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedAsset {
    pub name: Option<String>,
    pub path: String,
    pub volume: f64,
    pub repeat: bool,
}

impl DroppedAsset {
    #[must_use]
    pub fn into_slot(self) -> Slot {
        Slot {
            name: self.name.filter(|n| !n.is_empty()),
            volume: self.volume,
            repeat: self.repeat,
            ..Slot::with_path(self.path)
        }
        .normalized()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Render,
    SlotClicked { key: SlotKey },
    EditSlot { key: SlotKey },
    SlotSaved { key: SlotKey, slot: Slot },
    SlotDeleted { key: SlotKey },
    SlotDropped { from: SlotKey, to: SlotKey, resolution: Option<DropResolution>, duplicate: bool },
    AssetDropped { to: SlotKey, asset: DroppedAsset },
    BoardSelected { idx: usize },
    BoardCreated { name: String },
    BoardRenamed { idx: Option<usize>, name: String },
    BoardDeleted { idx: Option<usize> },
    GridResized { rows: i64, cols: i64 },
    HideUnusedToggled,
    Import { json: String },
    Export { scope: ExportScope },
}

// =============================================================================
// OUTCOMES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoundboardView {
    pub user: String,
    pub board_idx: usize,
    pub board_name: String,
    pub boards: Vec<BoardListEntry>,
    pub grid: GridView,
    pub schema: SchemaVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub code: &'static str,
    pub message: String,
}

impl Notice {
    fn from_error(err: &SoundboardError) -> Self {
        let level = match err.kind() {
            ErrorKind::Validation | ErrorKind::Configuration => NoticeLevel::Warn,
            ErrorKind::Authorization | ErrorKind::IndexOutOfRange | ErrorKind::Storage | ErrorKind::Network => {
                NoticeLevel::Error
            }
        };
        Self { level, code: err.error_code(), message: err.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportFile {
    pub filename: String,
    pub json: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Redraw with this view.
    Render(SoundboardView),
    /// Show a non-blocking notice. State is unchanged.
    Notify(Notice),
    /// Ask whether a drop onto an assigned slot overwrites or swaps, then
    /// resend `SlotDropped` with the answer.
    ConfirmDrop { from: SlotKey, to: SlotKey },
    OpenEditor(SlotEditor),
    Played { path: String, playing: bool },
    Exported(ExportFile),
}

// =============================================================================
// CONTROLLER
// =============================================================================

pub struct Soundboard {
    ctx: AppContext,
    tracker: Mutex<PlayingTracker>,
}

impl Soundboard {
    #[must_use]
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx, tracker: Mutex::new(PlayingTracker::new()) }
    }

    #[must_use]
    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Playlist the acting user's clicks play into.
    #[must_use]
    pub fn playlist_label(&self) -> String {
        format!("Soundboard: {}", self.ctx.config.user_name)
    }

    /// Now-playing notifications from the playback collaborator.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.ctx.playback.subscribe()
    }

    /// Run a command, turning failures into a notice.
    pub async fn handle(&self, cmd: Command) -> Outcome {
        match self.dispatch(cmd).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let notice = Notice::from_error(&e);
                match notice.level {
                    NoticeLevel::Error => error!(code = notice.code, error = %e, "soundboard command failed"),
                    _ => warn!(code = notice.code, error = %e, "soundboard command rejected"),
                }
                Outcome::Notify(notice)
            }
        }
    }

    /// Run a command.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when the acting user may not use the
    /// soundboard, a validation error for rejected input, or the settings
    /// and playback collaborators' failures.
    pub async fn dispatch(&self, cmd: Command) -> Result<Outcome, SoundboardError> {
        self.authorize().await?;
        let mut collection = self.load().await?;

        match cmd {
            Command::Render => {}
            Command::SlotClicked { key } => return self.play_slot(&collection, key).await,
            Command::EditSlot { key } => {
                let board = collection.current_board(None)?;
                let idx = key.reading_index(board.effective_cols(&self.ctx.config.grid));
                let editor = SlotEditor::open(key, idx, board.slot(key), self.ctx.config.schema);
                return Ok(Outcome::OpenEditor(editor));
            }
            Command::SlotSaved { key, slot } => {
                let slot = slot.normalized();
                if !slot.is_assigned() {
                    return Err(EditorError::NoAudio.into());
                }
                collection.current_board_mut(None)?.slots.insert(key, slot);
                self.store(&collection).await?;
                info!(slot = %key, "slot saved");
            }
            Command::SlotDeleted { key } => {
                collection.current_board_mut(None)?.slots.remove(&key);
                self.store(&collection).await?;
                info!(slot = %key, "slot deleted");
            }
            Command::SlotDropped { from, to, resolution, duplicate } => {
                if from == to {
                    return self.render(&collection).await;
                }
                let board = collection.current_board_mut(None)?;
                if !move_slot(board, from, to, resolution, duplicate)? {
                    return Ok(Outcome::ConfirmDrop { from, to });
                }
                self.store(&collection).await?;
            }
            Command::AssetDropped { to, asset } => {
                let board = collection.current_board_mut(None)?;
                if board.slots.contains_key(&to) {
                    return Err(SoundboardError::SlotExists(to));
                }
                board.slots.insert(to, asset.into_slot());
                self.store(&collection).await?;
            }
            Command::BoardSelected { idx } => {
                collection.select_board(idx)?;
                self.store(&collection).await?;
            }
            Command::BoardCreated { name } => {
                collection.create_board(&name, &self.ctx.config.grid)?;
                self.store(&collection).await?;
            }
            Command::BoardRenamed { idx, name } => {
                collection.rename_board(idx, &name)?;
                self.store(&collection).await?;
            }
            Command::BoardDeleted { idx } => {
                collection.delete_board(idx)?;
                self.store(&collection).await?;
            }
            Command::GridResized { rows, cols } => {
                collection.resize_board(None, rows, cols, &self.ctx.config.grid)?;
                self.store(&collection).await?;
            }
            Command::HideUnusedToggled => {
                let board = collection.current_board_mut(None)?;
                board.hide_unused = Some(!board.hide_unused.unwrap_or(false));
                self.store(&collection).await?;
            }
            Command::Import { json } => {
                collection = import_document(&json, collection, &self.ctx.config.grid)?;
                self.store(&collection).await?;
                info!(boards = collection.boards.len(), "soundboard imported");
            }
            Command::Export { scope } => return Ok(Outcome::Exported(export_document(&collection, scope)?)),
        }

        self.render(&collection).await
    }

    /// Join a playback transition into the view. Transitions for paths not
    /// on the displayed board are ignored. Re-renders after `render_delay`.
    pub async fn handle_playback_event(&self, event: &PlaybackEvent) -> Option<Outcome> {
        let initialized = self.tracker.lock().await.is_initialized();
        if !initialized {
            if let Err(e) = self.track_current().await {
                warn!(error = %e, "could not prime playing tracker");
                return None;
            }
        }
        if !self.tracker.lock().await.update(&event.path, event.playing) {
            return None;
        }
        tokio::time::sleep(self.ctx.config.render_delay).await;
        Some(self.handle(Command::Render).await)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    async fn authorize(&self) -> Result<(), SoundboardError> {
        if self.ctx.config.is_gm {
            return Ok(());
        }
        let allowed = settings::read_or_default(self.ctx.settings.as_ref(), settings::ALLOW_PLAYERS).await?;
        if allowed.as_bool().unwrap_or(true) { Ok(()) } else { Err(SoundboardError::Unauthorized) }
    }

    async fn load(&self) -> Result<BoardCollection, SoundboardError> {
        let raw = settings::read_or_default(self.ctx.settings.as_ref(), settings::SOUNDBOARDS).await?;
        let (mut collection, migrated) = migrate_if_legacy(raw)?;
        let clamped = collection.clamp_dimensions(&self.ctx.config.grid);
        if migrated || clamped {
            self.store(&collection).await?;
            info!(boards = collection.boards.len(), "soundboard settings migrated");
        }
        Ok(collection)
    }

    async fn store(&self, collection: &BoardCollection) -> Result<(), SoundboardError> {
        self.ctx.settings.set(settings::SOUNDBOARDS, collection.to_value()).await?;
        Ok(())
    }

    async fn track_current(&self) -> Result<(), SoundboardError> {
        let collection = self.load().await?;
        let board = collection.current_board(None)?;
        self.tracker.lock().await.track_board(board);
        Ok(())
    }

    async fn render(&self, collection: &BoardCollection) -> Result<Outcome, SoundboardError> {
        let board = collection.current_board(None)?;
        let playing = {
            let mut tracker = self.tracker.lock().await;
            tracker.track_board(board);
            tracker.playing()
        };
        Ok(Outcome::Render(SoundboardView {
            user: self.ctx.config.user_name.clone(),
            board_idx: collection.current,
            board_name: board.display_name().to_string(),
            boards: collection.list_boards(),
            grid: layout(board, &self.ctx.config.grid, &playing),
            schema: self.ctx.config.schema,
        }))
    }

    async fn play_slot(&self, collection: &BoardCollection, key: SlotKey) -> Result<Outcome, SoundboardError> {
        let slot = collection
            .current_board(None)?
            .slot(key)
            .filter(|s| s.is_assigned())
            .ok_or(SoundboardError::SlotNotAssigned(key))?;
        let path = {
            let mut rng = rand::rng();
            slot.pick_path(&mut rng).map(str::to_string)
        }
        .ok_or(SoundboardError::SlotNotAssigned(key))?;

        let playing = self
            .ctx
            .playback
            .play_or_toggle(&path, &PlayOptions::from_slot(slot), &self.playlist_label())
            .await?;
        info!(slot = %key, path = %path, playing, "slot played");
        Ok(Outcome::Played { path, playing })
    }
}

/// Apply a slot-to-slot drop. Returns `false` when the destination is
/// assigned and no resolution was given yet.
fn move_slot(
    board: &mut Board,
    from: SlotKey,
    to: SlotKey,
    resolution: Option<DropResolution>,
    duplicate: bool,
) -> Result<bool, SoundboardError> {
    let source = board.slots.get(&from).cloned().ok_or(SoundboardError::SlotNotAssigned(from))?;
    let target = board.slots.get(&to).cloned();

    let resolution = match (&target, resolution) {
        (None, _) => DropResolution::Overwrite,
        (Some(_), Some(r)) => r,
        (Some(_), None) => return Ok(false),
    };

    board.slots.insert(to, source);
    match (resolution, target) {
        (DropResolution::Swap, Some(previous)) => {
            board.slots.insert(from, previous);
        }
        _ if !duplicate => {
            board.slots.remove(&from);
        }
        _ => {}
    }
    info!(from = %from, to = %to, ?resolution, duplicate, "slot moved");
    Ok(true)
}

// =============================================================================
// IMPORT / EXPORT
// =============================================================================

/// Serialize the current board or the whole collection as a versioned,
/// pretty-printed document.
///
/// # Errors
///
/// Returns `IndexOutOfRange` if the current pointer is invalid, or a settings
/// JSON error if serialization fails.
pub fn export_document(collection: &BoardCollection, scope: ExportScope) -> Result<ExportFile, SoundboardError> {
    let (value, slug) = match scope {
        ExportScope::Board => {
            let board = collection.current_board(None)?;
            (board.to_value(), slugify(board.display_name()))
        }
        ExportScope::Collection => (collection.to_value(), "collection".to_string()),
    };

    let mut doc = Map::new();
    doc.insert(SCHEMA_VERSION_KEY.into(), Value::from(EXPORT_SCHEMA_VERSION));
    if let Value::Object(body) = value {
        doc.extend(body);
    }
    let json = serde_json::to_string_pretty(&Value::Object(doc)).map_err(SettingsError::from)?;
    Ok(ExportFile { filename: format!("soundboard-{slug}.json"), json })
}

/// Merge an imported document into `collection`.
///
/// - versioned or unversioned full collection: replaces the collection
/// - unversioned `fav{N}` export: replaces the current board's slots, with
///   `N` mapped onto the current column count
/// - any other object: replaces the current board
///
/// Imported grid dimensions are clamped into `limits`.
///
/// # Errors
///
/// Returns `InvalidImport` for unparseable documents, unsupported versions,
/// or a `fav` document with a key that is not `fav{N}`.
pub fn import_document(
    json: &str,
    mut collection: BoardCollection,
    limits: &GridLimits,
) -> Result<BoardCollection, SoundboardError> {
    let value: Value = serde_json::from_str(json).map_err(|e| SoundboardError::InvalidImport(e.to_string()))?;
    let Value::Object(mut doc) = value else {
        return Err(SoundboardError::InvalidImport("expected a JSON object".into()));
    };

    let version = doc.remove(SCHEMA_VERSION_KEY);
    if let Some(v) = &version {
        match v.as_u64() {
            Some(n) if n <= EXPORT_SCHEMA_VERSION => {}
            _ => return Err(SoundboardError::InvalidImport(format!("unsupported schema version {v}"))),
        }
    }

    if doc.contains_key("boards") {
        let (mut imported, _) = migrate_if_legacy(Value::Object(doc))?;
        imported.clamp_dimensions(limits);
        return Ok(imported);
    }

    if version.is_none() && !doc.is_empty() && doc.keys().all(|k| k.starts_with(LEGACY_EXPORT_PREFIX)) {
        let favs = doc
            .iter()
            .map(|(key, raw)| {
                key[LEGACY_EXPORT_PREFIX.len()..]
                    .parse::<usize>()
                    .map(|n| (n, raw))
                    .map_err(|_| SoundboardError::InvalidImport(format!("unrecognized key {key:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let board = collection.current_board_mut(None)?;
        let cols = board.effective_cols(limits);
        board.slots = favs
            .into_iter()
            .map(|(n, raw)| (SlotKey::new(n / cols, n % cols), Slot::normalize(raw)))
            .collect();
        return Ok(collection);
    }

    let mut board = Board::from_value(Value::Object(doc))?;
    board.clamp_dimensions(limits);
    collection.set_current_board(board, None)?;
    Ok(collection)
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() { "board".to_string() } else { slug.to_string() }
}

#[cfg(test)]
#[path = "soundboard_test.rs"]
mod tests;
