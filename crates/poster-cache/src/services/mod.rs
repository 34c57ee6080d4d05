//! Service layer for business logic
//!
//! - [`image_transform`]: raw upstream bytes to fixed-quality JPEG
//! - [`poster_cache`]: cache-first on-demand poster lookup
//! - [`reconciler`]: scheduled sweep keeping the cache in line with the catalog

pub mod image_transform;
pub mod poster_cache;
pub mod reconciler;

pub use image_transform::{ImageTransformer, OUTPUT_CONTENT_TYPE};
pub use poster_cache::{Poster, PosterCacheService, PosterSource};
pub use reconciler::{CatalogReconciler, ReconcileOptions, ReconcileStats};
