//! Playback collaborator — playlists, sounds, and now-playing notifications.
//!
//! DESIGN
//! ======
//! The soundboard never plays audio itself. It hands one resolved path plus
//! options to a `Playback` implementation, which finds or creates a playlist
//! by label, finds or creates the sound for that path, and toggles it.
//! State transitions are published on a broadcast channel; the controller
//! subscribes and joins them into the grid view.
//!
//! `PlaylistPlayback` is the in-process model used by the CLI and tests.
//! Hosts with a real audio engine implement the trait themselves.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{Mutex, broadcast};
use tracing::info;
use uuid::Uuid;

use crate::error::{ErrorCode, ErrorKind};
use crate::media;
use crate::services::slot::{AudioChannel, Slot};

const EVENT_CAPACITY: usize = 64;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayOptions {
    pub volume: f64,
    pub channel: AudioChannel,
    pub fade: Option<f64>,
    pub repeat: bool,
}

impl PlayOptions {
    #[must_use]
    pub fn from_slot(slot: &Slot) -> Self {
        Self { volume: slot.volume, channel: slot.channel, fade: slot.fade, repeat: slot.repeat }
    }
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self { volume: 1.0, channel: AudioChannel::default(), fade: None, repeat: false }
    }
}

/// A now-playing transition for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackEvent {
    pub path: String,
    pub playing: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("playback rejected: {0}")]
    Rejected(String),
}

impl ErrorCode for PlaybackError {
    fn error_code(&self) -> &'static str {
        "E_PLAYBACK"
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Storage
    }
}

#[async_trait]
pub trait Playback: Send + Sync {
    /// Start `path` in the playlist named `playlist`, or stop it if it is
    /// already playing. Returns the new playing state.
    async fn play_or_toggle(&self, path: &str, opts: &PlayOptions, playlist: &str) -> Result<bool, PlaybackError>;

    fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent>;
}

// =============================================================================
// PLAYLIST MODEL
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistSound {
    pub id: Uuid,
    pub name: String,
    pub path: String,
    pub options: PlayOptions,
    pub playing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Playlist {
    pub id: Uuid,
    pub name: String,
    pub sounds: Vec<PlaylistSound>,
}

pub struct PlaylistPlayback {
    playlists: Mutex<Vec<Playlist>>,
    events: broadcast::Sender<PlaybackEvent>,
}

impl PlaylistPlayback {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { playlists: Mutex::new(Vec::new()), events }
    }

    /// Snapshot of every playlist.
    pub async fn playlists(&self) -> Vec<Playlist> {
        self.playlists.lock().await.clone()
    }

    /// Percent-decoded paths currently playing in any playlist.
    pub async fn playing_paths(&self) -> Vec<String> {
        self.playlists
            .lock()
            .await
            .iter()
            .flat_map(|p| p.sounds.iter())
            .filter(|s| s.playing)
            .map(|s| media::clean_uri(&s.path))
            .collect()
    }
}

impl Default for PlaylistPlayback {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Playback for PlaylistPlayback {
    async fn play_or_toggle(&self, path: &str, opts: &PlayOptions, playlist: &str) -> Result<bool, PlaybackError> {
        if path.is_empty() {
            return Err(PlaybackError::Rejected("empty path".into()));
        }

        let mut playlists = self.playlists.lock().await;
        let list_idx = match playlists.iter().position(|p| p.name == playlist) {
            Some(idx) => idx,
            None => {
                info!(playlist, "playlist created");
                playlists.push(Playlist { id: Uuid::new_v4(), name: playlist.to_string(), sounds: Vec::new() });
                playlists.len() - 1
            }
        };
        let list = &mut playlists[list_idx];

        let sound_idx = match list.sounds.iter().position(|s| s.path == path) {
            Some(idx) => idx,
            None => {
                list.sounds.push(PlaylistSound {
                    id: Uuid::new_v4(),
                    name: media::pretty_media_name(path),
                    path: path.to_string(),
                    options: opts.clone(),
                    playing: false,
                });
                list.sounds.len() - 1
            }
        };
        let sound = &mut list.sounds[sound_idx];

        sound.options = opts.clone();
        sound.playing = !sound.playing;
        let playing = sound.playing;
        info!(playlist, sound = %sound.name, playing, "sound toggled");

        // No subscribers is fine.
        let _ = self.events.send(PlaybackEvent { path: path.to_string(), playing });
        Ok(playing)
    }

    fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }
}
