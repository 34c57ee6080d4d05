//! Shared fixtures for poster cache integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use tokio::sync::Semaphore;

use keyed_file_store::KeyedFileStore;
use poster_cache::errors::{UpstreamError, UpstreamResult};
use poster_cache::services::{
    CatalogReconciler, ImageTransformer, PosterCacheService, ReconcileOptions,
};
use poster_cache::sources::{CatalogItem, CatalogSource, ImageProbe, RawImage};

pub const LIBRARY_ID: &str = "movies-library";

/// Encode a small PNG whose pixels depend on `seed`.
pub fn png_poster(width: u32, height: u32, seed: u8) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            seed.wrapping_add((x % 256) as u8),
            seed.wrapping_mul(3).wrapping_add((y % 256) as u8),
            seed,
        ])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

#[derive(Default)]
struct CatalogState {
    items: Vec<CatalogItem>,
    images: HashMap<String, Bytes>,
    last_modified: HashMap<String, DateTime<Utc>>,
    fail_listing: bool,
    failing_probes: HashSet<String>,
    listing_gate: Option<Arc<Semaphore>>,
}

/// In-memory catalog with call counters.
#[derive(Default)]
pub struct FakeCatalog {
    state: Mutex<CatalogState>,
    pub list_calls: AtomicUsize,
    pub head_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_item(&self, id: &str, image: Vec<u8>) {
        let mut state = self.state.lock().unwrap();
        state.items.push(CatalogItem::new(id, format!("Movie {id}")));
        state.images.insert(id.to_string(), Bytes::from(image));
    }

    pub fn add_folder(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.items.push(CatalogItem::folder(id, format!("Folder {id}")));
    }

    pub fn remove_item(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.items.retain(|item| item.id != id);
        state.images.remove(id);
        state.last_modified.remove(id);
    }

    pub fn set_image(&self, id: &str, image: Vec<u8>, last_modified: Option<DateTime<Utc>>) {
        let mut state = self.state.lock().unwrap();
        state.images.insert(id.to_string(), Bytes::from(image));
        match last_modified {
            Some(ts) => state.last_modified.insert(id.to_string(), ts),
            None => state.last_modified.remove(id),
        };
    }

    pub fn set_last_modified(&self, id: &str, last_modified: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        state.last_modified.insert(id.to_string(), last_modified);
    }

    pub fn fail_listing(&self, fail: bool) {
        self.state.lock().unwrap().fail_listing = fail;
    }

    pub fn fail_probe(&self, id: &str) {
        self.state.lock().unwrap().failing_probes.insert(id.to_string());
    }

    /// Block `list_items` until a permit is added to the returned semaphore.
    pub fn hold_listing(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.state.lock().unwrap().listing_gate = Some(gate.clone());
        gate
    }

    pub fn gets(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn missing(id: &str) -> UpstreamError {
        UpstreamError::Status {
            status: 404,
            url: format!("fake://Items/{id}/Images/Primary"),
        }
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn list_items(&self, parent_id: &str) -> UpstreamResult<Vec<CatalogItem>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.state.lock().unwrap().listing_gate.clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }

        let state = self.state.lock().unwrap();
        if state.fail_listing {
            return Err(UpstreamError::Status {
                status: 503,
                url: format!("fake://Items?parentId={parent_id}"),
            });
        }
        Ok(state.items.clone())
    }

    async fn head_image(&self, item_id: &str) -> UpstreamResult<ImageProbe> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.failing_probes.contains(item_id) {
            return Err(UpstreamError::Status {
                status: 500,
                url: format!("fake://Items/{item_id}/Images/Primary"),
            });
        }
        if !state.images.contains_key(item_id) {
            return Err(Self::missing(item_id));
        }
        Ok(ImageProbe {
            last_modified: state.last_modified.get(item_id).copied(),
        })
    }

    async fn get_image(&self, item_id: &str) -> UpstreamResult<RawImage> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        let bytes = state
            .images
            .get(item_id)
            .cloned()
            .ok_or_else(|| Self::missing(item_id))?;
        Ok(RawImage {
            bytes,
            content_type: Some("image/png".to_string()),
        })
    }
}

pub fn default_options() -> ReconcileOptions {
    ReconcileOptions {
        library_id: LIBRARY_ID.to_string(),
        recency_window: Duration::from_secs(24 * 3600),
        probe_concurrency: 4,
        warm_missing_entries: true,
    }
}

/// A wired-up store, service and reconciler over a [`FakeCatalog`].
pub struct Harness {
    pub dir: TempDir,
    pub catalog: Arc<FakeCatalog>,
    pub store: KeyedFileStore,
    pub posters: PosterCacheService,
    pub reconciler: Arc<CatalogReconciler>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_options(default_options()).await
    }

    pub async fn with_options(options: ReconcileOptions) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyedFileStore::builder()
            .root_directory(dir.path().join("posters"))
            .extension("jpg")
            .clear_on_open(true)
            .build()
            .await
            .unwrap();

        let catalog = FakeCatalog::new();
        let source: Arc<dyn CatalogSource> = catalog.clone();
        let posters = PosterCacheService::new(store.clone(), source, ImageTransformer::default());
        let reconciler = Arc::new(CatalogReconciler::new(posters.clone(), options));

        Self {
            dir,
            catalog,
            store,
            posters,
            reconciler,
        }
    }

    pub async fn sorted_keys(&self) -> Vec<String> {
        let mut keys = self.store.list_keys().await.unwrap();
        keys.sort();
        keys
    }
}
