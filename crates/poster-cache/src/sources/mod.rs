//! Upstream media catalog abstractions
//!
//! The reconciliation engine only needs three things from a catalog: list the
//! children of a library, probe an item's primary image for its modification
//! time, and fetch that image. [`CatalogSource`] captures exactly that so the
//! engine can run against the Jellyfin client in production and an in-memory
//! fake in tests.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::UpstreamResult;

pub mod jellyfin;

pub use jellyfin::JellyfinClient;

/// A single catalog entry as returned by a library listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_folder: bool,
    /// Item kind reported by the catalog (`Movie`, `Folder`, `BoxSet`, ...)
    #[serde(default, rename = "Type")]
    pub item_type: Option<String>,
}

impl CatalogItem {
    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_folder: false,
            item_type: None,
        }
    }

    pub fn folder<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            is_folder: true,
            item_type: Some("Folder".to_string()),
            ..Self::new(id, name)
        }
    }
}

/// Metadata from a HEAD probe of an item's primary image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageProbe {
    /// Parsed `Last-Modified`, absent when upstream omits or garbles it
    pub last_modified: Option<DateTime<Utc>>,
}

/// Raw, untransformed image bytes fetched from upstream.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// Read-only view of an upstream media catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Direct children of `parent_id`, folders included.
    async fn list_items(&self, parent_id: &str) -> UpstreamResult<Vec<CatalogItem>>;

    /// Probe the primary image of `item_id` without downloading it.
    async fn head_image(&self, item_id: &str) -> UpstreamResult<ImageProbe>;

    /// Download the primary image of `item_id`.
    async fn get_image(&self, item_id: &str) -> UpstreamResult<RawImage>;
}
