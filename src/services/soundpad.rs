//! Sound-pad browser — folder tree, search, and play/preview over the catalog.
//!
//! DESIGN
//! ======
//! `SoundpadBrowser::build` turns one creator's flattened catalog index into
//! the browsable model: display names, lowercased categories, a folder tree
//! keyed by the last folder segment, and alternate takes grouped under the
//! sound they vary. Sounds are numbered 1-based in catalog order; that
//! number is the stable handle used by search results, hide toggles, play,
//! preview, and drag payloads.
//!
//! Root-level files are alternates. A root file `storm_(rain).ogg` attaches
//! to the first sound in each folder whose path contains `/storm_`. The root
//! folder itself is not shown.
//!
//! The async functions at the bottom bind the model to the app context
//! (settings, playback, catalog cache).

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::catalog::{self, CatalogError, CatalogIndex, IndexedPack};
use crate::error::{ErrorCode, ErrorKind};
use crate::media;
use crate::playback::{PlayOptions, PlaybackError};
use crate::services::soundboard::DroppedAsset;
use crate::settings::{self, SettingsError};
use crate::state::AppContext;

/// Bucket in the hidden-files setting that holds hidden folder keys.
pub const HIDDEN_FOLDERS: &str = "folders";
const ROOT_FOLDER: &str = "/";
/// Sounds longer than this preview from their midpoint.
const PREVIEW_MIDPOINT_AFTER_SECS: f64 = 20.0;

/// Pack id (or `folders`) to hidden keys.
pub type HiddenFiles = BTreeMap<String, Vec<String>>;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SoundpadError {
    #[error("no sound with index {0}")]
    UnknownSound(usize),
    #[error("no folder {0:?}")]
    UnknownFolder(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

impl ErrorCode for SoundpadError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownSound(_) | Self::UnknownFolder(_) => "E_INDEX_OUT_OF_RANGE",
            Self::Catalog(e) => e.error_code(),
            Self::Settings(e) => e.error_code(),
            Self::Playback(e) => e.error_code(),
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownSound(_) | Self::UnknownFolder(_) => ErrorKind::IndexOutOfRange,
            Self::Catalog(e) => e.kind(),
            Self::Settings(e) => e.kind(),
            Self::Playback(e) => e.kind(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Catalog(e) => e.retryable(),
            Self::Settings(e) => e.retryable(),
            _ => false,
        }
    }
}

// =============================================================================
// MODEL
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PadSound {
    /// 1-based handle.
    pub idx: usize,
    /// Index of the owning pack.
    pub pack: usize,
    pub filename: String,
    pub name: String,
    pub cat: Vec<String>,
    pub tags: Option<String>,
    pub duration: Option<f64>,
    pub order: i64,
    /// Alternate takes, by handle.
    pub alt: Vec<usize>,
    pub sas: Option<String>,
}

impl PadSound {
    #[must_use]
    pub fn is_loop(&self) -> bool {
        self.filename.to_lowercase().contains("loop")
    }

    #[must_use]
    pub fn pretty_duration(&self) -> String {
        media::pretty_duration(self.duration.unwrap_or(0.0))
    }

    /// Label when shown as an alternate: the parenthesized part of the name.
    #[must_use]
    pub fn alt_label(&self) -> &str {
        parenthesized(&self.name).unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PadFolder {
    /// Last folder segment plus `/`.
    pub key: String,
    pub name: String,
    /// Handles in display order.
    pub sounds: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoundpadBrowser {
    pub creator: &'static str,
    pub publisher: &'static str,
    pub packs: Vec<IndexedPack>,
    pub sounds: Vec<PadSound>,
    pub folders: Vec<PadFolder>,
    /// Lowercased categories in first-seen order.
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub category: Option<String>,
    pub show_all: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderMatch {
    pub key: String,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub matches: Vec<usize>,
    pub folders: Vec<FolderMatch>,
    /// Matches inside visible folders.
    pub total: usize,
}

/// What a click on a sound asks the playback collaborator to do.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PadPlay {
    pub url: String,
    pub name: String,
    pub playlist: String,
    pub options: PlayOptions,
}

/// Payload carried when a sound is dragged out of the browser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DragPayload {
    pub sound: PadSound,
    pub pack_id: String,
    pub url: String,
    pub volume: f64,
    pub repeat: bool,
}

impl DragPayload {
    /// The asset a soundboard slot receives when this payload is dropped.
    #[must_use]
    pub fn to_asset(&self) -> DroppedAsset {
        DroppedAsset {
            name: Some(media::pretty_media_name(&self.sound.filename)),
            path: self.url.clone(),
            volume: self.volume,
            repeat: self.repeat,
        }
    }
}

/// Target of a hide toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HideTarget {
    Sound(usize),
    Folder(String),
}

// =============================================================================
// NAMES
// =============================================================================

/// Display name from a file name: drop `.ogg` and `loop`, turn `_`/`-` into
/// spaces, uppercase the first letter of each word.
#[must_use]
pub fn clean_sound_name(filename: &str) -> String {
    filename
        .replace(".ogg", "")
        .replace("loop", "")
        .replace(['_', '-'], " ")
        .replacen('/', " / ", 1)
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Folder label: last segment of the key with the first parenthesized part removed.
#[must_use]
pub fn folder_display_name(key: &str) -> String {
    let trimmed = key.strip_suffix('/').unwrap_or(key);
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let span = last
        .find('(')
        .and_then(|open| last[open + 1..].find(')').map(|c| (open, open + 1 + c)));
    let name = match span {
        Some((open, close)) if close > open + 1 => format!("{}{}", &last[..open], &last[close + 1..]),
        _ => last.to_string(),
    };
    name.trim().to_string()
}

fn parenthesized(text: &str) -> Option<&str> {
    let open = text.find('(')?;
    let close = open + 1 + text[open + 1..].find(')')?;
    (close > open + 1).then(|| &text[open + 1..close])
}

fn folder_key(filename: &str) -> String {
    let parent = filename.rfind('/').map_or("", |i| &filename[..i]);
    let last = parent.rsplit('/').next().unwrap_or(parent);
    format!("{last}/")
}

// =============================================================================
// BUILD
// =============================================================================

impl SoundpadBrowser {
    /// Build the browser for `creator` from its catalog index.
    #[must_use]
    pub fn build(creator: &'static str, index: &CatalogIndex) -> Self {
        let publisher = catalog::publisher_for(creator).unwrap_or(creator);
        let mut categories: Vec<String> = Vec::new();

        let mut sounds: Vec<PadSound> = index
            .assets
            .iter()
            .enumerate()
            .map(|(i, asset)| {
                let cat: Vec<String> = asset.cat.iter().map(|c| c.to_lowercase()).collect();
                for c in &cat {
                    if !categories.contains(c) {
                        categories.push(c.clone());
                    }
                }
                let file = asset.filename.rsplit('/').next().unwrap_or(&asset.filename);
                PadSound {
                    idx: i + 1,
                    pack: asset.pack,
                    filename: asset.filename.clone(),
                    name: asset.title.clone().unwrap_or_else(|| clean_sound_name(file)),
                    cat,
                    tags: asset.tags.clone(),
                    duration: asset.duration,
                    order: asset.order.unwrap_or(0),
                    alt: Vec::new(),
                    sas: asset.sas.clone(),
                }
            })
            .collect();

        // Folder membership in catalog order, insertion-ordered keys.
        let mut members: Vec<(String, Vec<usize>)> = Vec::new();
        for sound in &sounds {
            let key = folder_key(&sound.filename);
            match members.iter_mut().find(|(k, _)| *k == key) {
                Some((_, list)) => list.push(sound.idx),
                None => members.push((key, vec![sound.idx])),
            }
        }

        attach_alternates(&mut sounds, &members);

        let mut folders: Vec<PadFolder> = members
            .into_iter()
            .filter(|(key, _)| key != ROOT_FOLDER)
            .map(|(key, mut list)| {
                list.sort_by(|a, b| {
                    let (sa, sb) = (&sounds[a - 1], &sounds[b - 1]);
                    sa.order
                        .cmp(&sb.order)
                        .then_with(|| sa.name.to_lowercase().cmp(&sb.name.to_lowercase()))
                });
                PadFolder { name: folder_display_name(&key), key, sounds: list }
            })
            .collect();
        folders.sort_by(|a, b| a.key.cmp(&b.key));

        let packs = index.packs.clone();
        Self { creator, publisher, packs, sounds, folders, categories }
    }

    #[must_use]
    pub fn sound(&self, idx: usize) -> Option<&PadSound> {
        idx.checked_sub(1).and_then(|i| self.sounds.get(i))
    }

    #[must_use]
    pub fn pack_of(&self, sound: &PadSound) -> Option<&IndexedPack> {
        self.packs.iter().find(|p| p.idx == sound.pack)
    }

    #[must_use]
    pub fn folder(&self, key: &str) -> Option<&PadFolder> {
        self.folders.iter().find(|f| f.key == key)
    }

    fn resolve(&self, idx: usize) -> Result<(&PadSound, &IndexedPack), SoundpadError> {
        let sound = self.sound(idx).ok_or(SoundpadError::UnknownSound(idx))?;
        let pack = self.pack_of(sound).ok_or(SoundpadError::UnknownSound(idx))?;
        Ok((sound, pack))
    }

    /// Playlist the browser plays into.
    #[must_use]
    pub fn playlist_label(&self) -> String {
        format!("{} (Sound Pads)", self.publisher)
    }

    // =========================================================================
    // SEARCH
    // =========================================================================

    /// Filter sounds by free text, category, and hidden state.
    ///
    /// Every whitespace-separated term must appear in the name or tags.
    /// Hidden sounds and hidden folders are excluded unless `show_all`.
    #[must_use]
    pub fn search(&self, query: &SearchQuery, hidden: &HiddenFiles) -> SearchResult {
        let text = query.text.to_lowercase();
        let terms: Vec<&str> = text.split_whitespace().collect();
        let category = query.category.as_ref().map(|c| c.to_lowercase());

        let hidden_files: HashSet<&str> = self
            .packs
            .iter()
            .filter_map(|p| hidden.get(&p.pack_id))
            .flatten()
            .map(String::as_str)
            .collect();
        let hidden_folders: HashSet<&str> = hidden
            .get(HIDDEN_FOLDERS)
            .map(|list| list.iter().map(String::as_str).collect())
            .unwrap_or_default();

        let matches: Vec<usize> = self
            .sounds
            .iter()
            .filter(|s| query.show_all || !hidden_files.contains(s.filename.as_str()))
            .filter(|s| category.as_ref().is_none_or(|c| s.cat.contains(c)))
            .filter(|s| {
                let name = s.name.to_lowercase();
                let tags = s.tags.as_deref().map(str::to_lowercase);
                terms
                    .iter()
                    .all(|t| name.contains(t) || tags.as_ref().is_some_and(|tags| tags.contains(t)))
            })
            .map(|s| s.idx)
            .collect();

        let matched: HashSet<usize> = matches.iter().copied().collect();
        let folders: Vec<FolderMatch> = self
            .folders
            .iter()
            .filter(|f| query.show_all || !hidden_folders.contains(f.key.as_str()))
            .filter_map(|f| {
                let count = f.sounds.iter().filter(|idx| matched.contains(*idx)).count();
                (count > 0).then(|| FolderMatch { key: f.key.clone(), name: f.name.clone(), count })
            })
            .collect();
        let total = folders.iter().map(|f| f.count).sum();

        SearchResult { matches, folders, total }
    }

    /// Hidden-files bucket and key for a hide toggle.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSound`/`UnknownFolder` for targets not in the browser.
    pub fn hide_key(&self, target: &HideTarget) -> Result<(String, String), SoundpadError> {
        match target {
            HideTarget::Sound(idx) => {
                let (sound, pack) = self.resolve(*idx)?;
                Ok((pack.pack_id.clone(), sound.filename.clone()))
            }
            HideTarget::Folder(key) => {
                let folder = self.folder(key).ok_or_else(|| SoundpadError::UnknownFolder(key.clone()))?;
                Ok((HIDDEN_FOLDERS.to_string(), folder.key.clone()))
            }
        }
    }

    // =========================================================================
    // PLAY / PREVIEW / DRAG
    // =========================================================================

    /// # Errors
    ///
    /// Returns `UnknownSound` for a bad handle.
    pub fn play_url(&self, idx: usize) -> Result<String, SoundpadError> {
        let (sound, pack) = self.resolve(idx)?;
        Ok(format!("{}/{}", pack.path, sound.filename))
    }

    /// # Errors
    ///
    /// Returns `UnknownSound` for a bad handle.
    pub fn play_request(&self, idx: usize, volume: f64) -> Result<PadPlay, SoundpadError> {
        let url = self.play_url(idx)?;
        let (sound, _) = self.resolve(idx)?;
        Ok(PadPlay {
            url,
            name: clean_sound_name(&sound.filename.replace('/', " | ")),
            playlist: self.playlist_label(),
            options: PlayOptions { volume, repeat: sound.is_loop(), ..PlayOptions::default() },
        })
    }

    /// Signed preview URL, seeking to the midpoint of long sounds.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSound` for a bad handle.
    pub fn preview_url(&self, idx: usize) -> Result<String, SoundpadError> {
        let (sound, pack) = self.resolve(idx)?;
        let mut url = format!("{}/{}", pack.path, sound.filename);
        if let Some(sas) = sound.sas.as_ref().or(pack.sas.as_ref()) {
            url.push('?');
            url.push_str(sas);
        }
        if let Some(duration) = sound.duration.filter(|d| *d > PREVIEW_MIDPOINT_AFTER_SECS) {
            url.push_str(&format!("#t={}", duration / 2.0));
        }
        Ok(url)
    }

    /// # Errors
    ///
    /// Returns `UnknownSound` for a bad handle.
    pub fn drag_payload(&self, idx: usize, volume: f64) -> Result<DragPayload, SoundpadError> {
        let (sound, pack) = self.resolve(idx)?;
        let mut carried = sound.clone();
        carried.sas = pack.sas.as_ref().map(|s| format!("?{s}"));
        Ok(DragPayload {
            url: format!("{}/{}", pack.path, sound.filename),
            repeat: sound.is_loop(),
            sound: carried,
            pack_id: pack.pack_id.clone(),
            volume,
        })
    }
}

fn attach_alternates(sounds: &mut [PadSound], members: &[(String, Vec<usize>)]) {
    let Some((_, roots)) = members.iter().find(|(k, _)| k == ROOT_FOLDER) else {
        return;
    };
    for &root in roots {
        let filename = &sounds[root - 1].filename;
        let Some(cut) = filename.find('_').filter(|i| *i > 0) else {
            continue;
        };
        let needle = format!("/{}_", &filename[..cut]);
        for (_, list) in members {
            if let Some(&target) = list.iter().find(|idx| sounds[**idx - 1].filename.contains(&needle)) {
                sounds[target - 1].alt.push(root);
            }
        }
    }
}

/// Flip `key` in `bucket`. Returns whether the key is hidden afterwards.
pub fn toggle_hidden(hidden: &mut HiddenFiles, bucket: &str, key: &str) -> bool {
    let list = hidden.entry(bucket.to_string()).or_default();
    if let Some(pos) = list.iter().position(|k| k == key) {
        list.remove(pos);
        false
    } else {
        list.push(key.to_string());
        true
    }
}

fn decode_hidden(value: Value) -> HiddenFiles {
    serde_json::from_value(value).unwrap_or_else(|e| {
        warn!(error = %e, "hidden sound-pad files setting unreadable; ignoring");
        HiddenFiles::new()
    })
}

// =============================================================================
// CONTEXT BINDINGS
// =============================================================================

/// Open the browser for the saved creator.
///
/// # Errors
///
/// Propagates settings and catalog failures.
pub async fn open(ctx: &AppContext) -> Result<SoundpadBrowser, SoundpadError> {
    let saved = settings::read_or_default(ctx.settings.as_ref(), settings::SOUNDPAD_CREATOR).await?;
    let creator = catalog::resolve_creator(saved.as_str());
    let index = ctx.catalog.index(creator).await?;
    Ok(SoundpadBrowser::build(creator, &index))
}

/// Persist a creator choice and open its browser.
///
/// # Errors
///
/// Returns `Catalog(UnknownCreator)` for keys outside the creators table.
pub async fn select_creator(ctx: &AppContext, creator: &str) -> Result<SoundpadBrowser, SoundpadError> {
    if catalog::publisher_for(creator).is_none() {
        return Err(CatalogError::UnknownCreator(creator.to_string()).into());
    }
    ctx.settings.set(settings::SOUNDPAD_CREATOR, Value::from(creator)).await?;
    open(ctx).await
}

/// # Errors
///
/// Propagates settings failures.
pub async fn load_hidden(ctx: &AppContext) -> Result<HiddenFiles, SoundpadError> {
    let raw = settings::read_or_default(ctx.settings.as_ref(), settings::SOUNDPAD_HIDDEN_FILES).await?;
    Ok(decode_hidden(raw))
}

/// Search with the persisted hidden set.
///
/// # Errors
///
/// Propagates settings failures.
pub async fn search(ctx: &AppContext, browser: &SoundpadBrowser, query: &SearchQuery) -> Result<SearchResult, SoundpadError> {
    let hidden = load_hidden(ctx).await?;
    Ok(browser.search(query, &hidden))
}

/// Toggle a sound or folder in the persisted hidden set.
///
/// # Errors
///
/// Returns `UnknownSound`/`UnknownFolder` or propagates settings failures.
pub async fn toggle_hide(ctx: &AppContext, browser: &SoundpadBrowser, target: &HideTarget) -> Result<bool, SoundpadError> {
    let (bucket, key) = browser.hide_key(target)?;
    let mut hidden = load_hidden(ctx).await?;
    let now_hidden = toggle_hidden(&mut hidden, &bucket, &key);
    let value = serde_json::to_value(&hidden).map_err(SettingsError::from)?;
    ctx.settings.set(settings::SOUNDPAD_HIDDEN_FILES, value).await?;
    info!(bucket = %bucket, key = %key, hidden = now_hidden, "sound-pad visibility toggled");
    Ok(now_hidden)
}

/// Current sound-pad volume setting.
///
/// # Errors
///
/// Propagates settings failures.
pub async fn volume(ctx: &AppContext) -> Result<f64, SoundpadError> {
    let raw = settings::read_or_default(ctx.settings.as_ref(), settings::SOUNDPAD_VOLUME).await?;
    Ok(raw.as_f64().filter(|v| v.is_finite()).map_or(1.0, |v| v.clamp(0.0, 1.0)))
}

/// Persist the volume slider. Only the GM's choice is stored.
///
/// # Errors
///
/// Propagates settings failures.
pub async fn set_volume(ctx: &AppContext, volume: f64) -> Result<bool, SoundpadError> {
    if !ctx.config.is_gm || !volume.is_finite() {
        return Ok(false);
    }
    ctx.settings.set(settings::SOUNDPAD_VOLUME, Value::from(volume.clamp(0.0, 1.0))).await?;
    Ok(true)
}

/// Whether the browser's volume and playback controls are collapsed.
///
/// # Errors
///
/// Propagates settings failures.
pub async fn controls_hidden(ctx: &AppContext) -> Result<bool, SoundpadError> {
    let raw = settings::read_or_default(ctx.settings.as_ref(), settings::SOUNDPAD_HIDE_CONTROLS).await?;
    Ok(raw.as_bool().unwrap_or(false))
}

/// Flip the collapsed-controls flag and return the new value.
///
/// # Errors
///
/// Propagates settings failures.
pub async fn toggle_controls(ctx: &AppContext) -> Result<bool, SoundpadError> {
    let hidden = !controls_hidden(ctx).await?;
    ctx.settings.set(settings::SOUNDPAD_HIDE_CONTROLS, Value::Bool(hidden)).await?;
    Ok(hidden)
}

/// Toggle a sound in the browser's playlist.
///
/// # Errors
///
/// Returns `UnknownSound` or propagates settings and playback failures.
pub async fn play(ctx: &AppContext, browser: &SoundpadBrowser, idx: usize) -> Result<bool, SoundpadError> {
    let request = browser.play_request(idx, volume(ctx).await?)?;
    let playing = ctx.playback.play_or_toggle(&request.url, &request.options, &request.playlist).await?;
    info!(sound = %request.name, playing, "sound pad toggled");
    Ok(playing)
}

/// Drag payload using the saved volume.
///
/// # Errors
///
/// Returns `UnknownSound` or propagates settings failures.
pub async fn drag(ctx: &AppContext, browser: &SoundpadBrowser, idx: usize) -> Result<DragPayload, SoundpadError> {
    let volume = volume(ctx).await?;
    browser.drag_payload(idx, volume)
}

#[cfg(test)]
#[path = "soundpad_test.rs"]
mod tests;
