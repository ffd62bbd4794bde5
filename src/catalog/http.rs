//! HTTP catalog source.
//!
//! Thin reqwest wrapper for `GET /soundpads/sounds`. Pure parsing in
//! `parse_catalog` for testability.

use async_trait::async_trait;
use tracing::info;

use super::types::CatalogCreator;
use super::{CatalogError, CatalogSource};
use crate::config::SoundpadConfig;

const CATALOG_PATH: &str = "/soundpads/sounds";

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpCatalog {
    http: reqwest::Client,
    url: String,
    session: Option<String>,
}

impl HttpCatalog {
    /// Build a client with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns `HttpClientBuild` if the TLS backend cannot be initialized.
    pub fn new(config: &SoundpadConfig) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| CatalogError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, url: catalog_url(&config.base_url), session: config.session.clone() })
    }
}

#[async_trait]
impl CatalogSource for HttpCatalog {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogCreator>, CatalogError> {
        let mut request = self.http.get(&self.url);
        if let Some(session) = &self.session {
            request = request.query(&[("session", session)]);
        }

        let response = request.send().await.map_err(|e| CatalogError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| CatalogError::Request(e.to_string()))?;

        if status != 200 {
            return Err(CatalogError::Response { status, body: text });
        }

        let creators = parse_catalog(&text)?;
        info!(url = %self.url, creators = creators.len(), "sound-pad catalog fetched");
        Ok(creators)
    }
}

fn catalog_url(base_url: &str) -> String {
    format!("{}{CATALOG_PATH}", base_url.trim_end_matches('/'))
}

// =============================================================================
// PARSING
// =============================================================================

/// Decode the catalog body.
///
/// # Errors
///
/// Returns `Parse` if the body is not a list of creators.
pub fn parse_catalog(json: &str) -> Result<Vec<CatalogCreator>, CatalogError> {
    serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))
}
