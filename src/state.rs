//! Shared application context.
//!
//! DESIGN
//! ======
//! `AppContext` is built once at startup and handed to every component that
//! needs a collaborator. It holds the settings store, the playback
//! collaborator, the catalog cache, and the typed config. Clone is cheap;
//! every collaborator is Arc-wrapped.

use std::sync::Arc;

use crate::catalog::http::HttpCatalog;
use crate::catalog::{CatalogCache, CatalogError, CatalogSource};
use crate::config::SoundboardConfig;
use crate::playback::{Playback, PlaylistPlayback};
use crate::settings::{JsonFileSettings, SettingsStore};

#[derive(Clone)]
pub struct AppContext {
    pub config: SoundboardConfig,
    pub settings: Arc<dyn SettingsStore>,
    pub playback: Arc<dyn Playback>,
    pub catalog: Arc<CatalogCache>,
}

impl AppContext {
    #[must_use]
    pub fn new(
        config: SoundboardConfig,
        settings: Arc<dyn SettingsStore>,
        playback: Arc<dyn Playback>,
        catalog: Arc<dyn CatalogSource>,
    ) -> Self {
        Self { config, settings, playback, catalog: Arc::new(CatalogCache::new(catalog)) }
    }

    /// Context with the file-backed store, in-process playlists, and the
    /// HTTP catalog.
    ///
    /// # Errors
    ///
    /// Returns `HttpClientBuild` if the HTTP client cannot be built.
    pub fn from_config(config: SoundboardConfig) -> Result<Self, CatalogError> {
        let settings = Arc::new(JsonFileSettings::new(&config.settings_path));
        let catalog = Arc::new(HttpCatalog::new(&config.soundpad)?);
        Ok(Self::new(config, settings, Arc::new(PlaylistPlayback::new()), catalog))
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
