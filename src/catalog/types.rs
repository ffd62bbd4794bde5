//! Wire and index types for the remote sound-pad catalog.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// =============================================================================
// WIRE TYPES
// =============================================================================

/// One publisher and its packs, as returned by the index endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogCreator {
    pub publisher: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub packs: Vec<CatalogPack>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogPack {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(rename = "licenseUrl", default)]
    pub license_url: Option<String>,
    pub path: String,
    #[serde(default)]
    pub assets: Vec<CatalogAsset>,
    #[serde(default)]
    pub free: bool,
    #[serde(rename = "isLocal", default)]
    pub is_local: bool,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub sas: Option<Sas>,
}

/// Access signature: one for the whole pack, or one pair per asset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Sas {
    Pack(String),
    PerAsset(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogAsset {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(rename = "loop", default)]
    pub looped: Option<bool>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub cat: Vec<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub tags: Option<String>,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected string or number, got {other}"))),
    }
}

// =============================================================================
// INDEX TYPES
// =============================================================================

/// A pack with its position in the flattened index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedPack {
    pub idx: usize,
    pub pack_id: String,
    pub publisher: String,
    pub pub_website: Option<String>,
    pub name: String,
    pub url: Option<String>,
    pub license: Option<String>,
    pub license_url: Option<String>,
    pub path: String,
    pub count: usize,
    pub is_local: bool,
    pub is_free: bool,
    pub source: Option<String>,
    /// Pack-wide signature, when the pack has one.
    pub sas: Option<String>,
}

/// A sound asset pointing back at its pack by index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedAsset {
    pub pack: usize,
    pub filename: String,
    pub duration: Option<f64>,
    pub looped: Option<bool>,
    pub title: Option<String>,
    pub cat: Vec<String>,
    pub order: Option<i64>,
    pub tags: Option<String>,
    /// Per-asset signature, when the pack signs assets individually.
    pub sas: Option<String>,
}

/// Flattened catalog: every pack plus every sound asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogIndex {
    pub packs: Vec<IndexedPack>,
    pub assets: Vec<IndexedAsset>,
}

impl CatalogIndex {
    /// Flatten creators into packs and `snd` assets. Pack indices are
    /// sequential across all creators.
    #[must_use]
    pub fn build(creators: &[CatalogCreator]) -> Self {
        let mut index = Self::default();
        for creator in creators {
            for pack in &creator.packs {
                let idx = index.packs.len();
                for (i, asset) in pack.assets.iter().enumerate() {
                    if asset.kind != "snd" {
                        continue;
                    }
                    let sas = match &pack.sas {
                        Some(Sas::PerAsset(list)) => list.get(2 * i).cloned(),
                        _ => None,
                    };
                    index.assets.push(IndexedAsset {
                        pack: idx,
                        filename: asset.path.clone(),
                        duration: asset.duration,
                        looped: asset.looped,
                        title: asset.title.clone(),
                        cat: asset.cat.clone(),
                        order: asset.order,
                        tags: asset.tags.clone(),
                        sas,
                    });
                }
                index.packs.push(IndexedPack {
                    idx,
                    pack_id: pack.id.clone(),
                    publisher: creator.publisher.clone(),
                    pub_website: creator.website.clone(),
                    name: pack.name.clone(),
                    url: pack.url.clone(),
                    license: pack.license.clone(),
                    license_url: pack.license_url.clone(),
                    path: pack.path.clone(),
                    count: pack.assets.len(),
                    is_local: pack.is_local,
                    is_free: pack.free,
                    source: pack.source.clone(),
                    sas: match &pack.sas {
                        Some(Sas::Pack(s)) => Some(s.clone()),
                        _ => None,
                    },
                });
            }
        }
        index
    }

    /// Packs of one publisher and their assets. Pack indices are kept.
    #[must_use]
    pub fn for_publisher(&self, publisher: &str) -> Self {
        let packs: Vec<IndexedPack> = self.packs.iter().filter(|p| p.publisher == publisher).cloned().collect();
        let assets = self
            .assets
            .iter()
            .filter(|a| packs.iter().any(|p| p.idx == a.pack))
            .cloned()
            .collect();
        Self { packs, assets }
    }

    #[must_use]
    pub fn pack(&self, idx: usize) -> Option<&IndexedPack> {
        self.packs.iter().find(|p| p.idx == idx)
    }
}
