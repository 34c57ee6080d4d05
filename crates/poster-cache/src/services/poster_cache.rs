//! On-demand poster lookup
//!
//! Serves posters from the cache store and fills misses from the upstream
//! catalog. A fill always returns the transformed bytes to the caller; the
//! cache write is best-effort and its outcome is reported separately.

use std::sync::Arc;

use keyed_file_store::{CacheStoreError, KeyedFileStore, StoreStats};
use tracing::{debug, trace, warn};

use crate::errors::PosterError;
use crate::services::image_transform::{ImageTransformer, OUTPUT_CONTENT_TYPE};
use crate::sources::CatalogSource;

/// Where a served poster came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosterSource {
    /// Read from the cache store
    Cache,
    /// Fetched and transformed just now; `persisted` is false when the cache write failed
    Upstream { persisted: bool },
}

/// A transformed poster ready to serve.
#[derive(Debug, Clone)]
pub struct Poster {
    pub bytes: Vec<u8>,
    pub source: PosterSource,
}

impl Poster {
    pub fn content_type(&self) -> &'static str {
        OUTPUT_CONTENT_TYPE
    }

    pub fn is_cache_hit(&self) -> bool {
        self.source == PosterSource::Cache
    }
}

/// Cache-first poster service.
#[derive(Clone)]
pub struct PosterCacheService {
    store: KeyedFileStore,
    catalog: Arc<dyn CatalogSource>,
    transformer: ImageTransformer,
}

impl PosterCacheService {
    pub fn new(
        store: KeyedFileStore,
        catalog: Arc<dyn CatalogSource>,
        transformer: ImageTransformer,
    ) -> Self {
        Self {
            store,
            catalog,
            transformer,
        }
    }

    pub fn store(&self) -> &KeyedFileStore {
        &self.store
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogSource> {
        &self.catalog
    }

    /// Return the poster for `item_id`, filling the cache on a miss.
    pub async fn get_image(&self, item_id: &str) -> Result<Poster, PosterError> {
        match self.store.read(item_id).await {
            Ok(bytes) => {
                trace!("Cache hit for item {}", item_id);
                return Ok(Poster {
                    bytes,
                    source: PosterSource::Cache,
                });
            }
            Err(CacheStoreError::NotFound { .. }) => {
                trace!("Cache miss for item {}", item_id);
            }
            Err(e) => {
                warn!(
                    "Cache read failed for item {}, falling back to upstream: {}",
                    item_id, e
                );
            }
        }

        self.refresh(item_id).await
    }

    /// Fetch, transform and store the poster for `item_id`, ignoring any cached copy.
    pub async fn refresh(&self, item_id: &str) -> Result<Poster, PosterError> {
        let raw = self
            .catalog
            .get_image(item_id)
            .await
            .map_err(|e| PosterError::from_upstream(item_id, e))?;
        trace!(
            "Fetched {} byte(s) of {} for item {}",
            raw.bytes.len(),
            raw.content_type.as_deref().unwrap_or("unknown type"),
            item_id
        );

        let bytes = self
            .transformer
            .transform_blocking(raw.bytes)
            .await
            .map_err(|e| PosterError::TransformFailure {
                item_id: item_id.to_string(),
                source: e,
            })?;

        let persisted = match self.store.write(item_id, &bytes).await {
            Ok(()) => {
                debug!("Cached poster for item {} ({} bytes)", item_id, bytes.len());
                true
            }
            Err(e) => {
                warn!("Failed to cache poster for item {}: {}", item_id, e);
                false
            }
        };

        Ok(Poster {
            bytes,
            source: PosterSource::Upstream { persisted },
        })
    }

    pub async fn is_cached(&self, item_id: &str) -> bool {
        match self.store.exists(item_id).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("Cache existence check failed for item {}: {}", item_id, e);
                false
            }
        }
    }

    /// Drop the cached poster for `item_id`. Returns whether an entry existed.
    pub async fn evict(&self, item_id: &str) -> Result<bool, CacheStoreError> {
        self.store.remove_if_exists(item_id).await
    }

    pub async fn cache_stats(&self) -> Result<StoreStats, CacheStoreError> {
        self.store.stats().await
    }
}
