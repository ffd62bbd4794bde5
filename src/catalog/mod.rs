//! Remote sound-pad catalog — source trait, creators table, and cache.
//!
//! DESIGN
//! ======
//! The remote index is read once and kept for the life of the process. There
//! is no expiry and no manual invalidation; a restart is the cache bust.
//! `CatalogCache::index` additionally memoizes the flattened index per
//! creator key, so switching creators back and forth never refetches.
//!
//! ERROR HANDLING
//! ==============
//! Network failures surface as `CatalogError` and leave the cache empty, so
//! the next call retries the fetch.

pub mod http;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, warn};

use crate::error::{ErrorCode, ErrorKind};
pub use types::{CatalogCreator, CatalogIndex, IndexedAsset, IndexedPack};

/// Creator key to publisher display name.
pub const CREATORS: [(&str, &str); 2] = [("tabletopaudio", "Tabletop Audio"), ("michaelghelfi", "Michael Ghelfi")];
pub const DEFAULT_CREATOR: &str = "tabletopaudio";

/// Publisher display name for a creator key.
#[must_use]
pub fn publisher_for(creator: &str) -> Option<&'static str> {
    CREATORS.iter().find(|(key, _)| *key == creator).map(|(_, name)| *name)
}

/// Resolve a saved creator key, falling back to the default creator.
#[must_use]
pub fn resolve_creator(saved: Option<&str>) -> &'static str {
    match saved {
        Some(key) => match CREATORS.iter().find(|(k, _)| *k == key) {
            Some((k, _)) => *k,
            None => {
                warn!(creator = key, fallback = DEFAULT_CREATOR, "unknown sound-pad creator");
                DEFAULT_CREATOR
            }
        },
        None => DEFAULT_CREATOR,
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("http client build failed: {0}")]
    HttpClientBuild(String),
    #[error("catalog request failed: {0}")]
    Request(String),
    #[error("catalog returned {status}: {body}")]
    Response { status: u16, body: String },
    #[error("catalog parse failed: {0}")]
    Parse(String),
    #[error("unknown creator: {0}")]
    UnknownCreator(String),
}

impl ErrorCode for CatalogError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::Request(_) => "E_CATALOG_REQUEST",
            Self::Response { .. } => "E_CATALOG_RESPONSE",
            Self::Parse(_) => "E_CATALOG_PARSE",
            Self::UnknownCreator(_) => "E_UNKNOWN_CREATOR",
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownCreator(_) | Self::HttpClientBuild(_) => ErrorKind::Configuration,
            Self::Request(_) | Self::Response { .. } | Self::Parse(_) => ErrorKind::Network,
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Response { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

// =============================================================================
// SOURCE
// =============================================================================

#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogCreator>, CatalogError>;
}

// =============================================================================
// CACHE
// =============================================================================

pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    full: OnceCell<Arc<CatalogIndex>>,
    by_creator: Mutex<HashMap<String, Arc<CatalogIndex>>>,
}

impl CatalogCache {
    #[must_use]
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self { source, full: OnceCell::new(), by_creator: Mutex::new(HashMap::new()) }
    }

    /// Index for one creator key, fetched on first use and memoized.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCreator` for keys outside the creators table, or the
    /// source's error when the first fetch fails.
    pub async fn index(&self, creator: &str) -> Result<Arc<CatalogIndex>, CatalogError> {
        let publisher = publisher_for(creator).ok_or_else(|| CatalogError::UnknownCreator(creator.to_string()))?;

        if let Some(hit) = self.by_creator.lock().await.get(creator) {
            return Ok(Arc::clone(hit));
        }

        let full = self
            .full
            .get_or_try_init(|| async {
                let creators = self.source.fetch_catalog().await?;
                Ok::<_, CatalogError>(Arc::new(CatalogIndex::build(&creators)))
            })
            .await?;

        let index = Arc::new(full.for_publisher(publisher));
        info!(creator, packs = index.packs.len(), sounds = index.assets.len(), "sound-pad index cached");
        self.by_creator
            .lock()
            .await
            .entry(creator.to_string())
            .or_insert_with(|| Arc::clone(&index));
        Ok(index)
    }
}
