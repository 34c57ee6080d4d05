//! On-demand poster lookup: cache hits, fills and failure handling

mod common;

use common::{Harness, png_poster};
use poster_cache::errors::PosterError;
use poster_cache::services::PosterSource;

#[tokio::test]
async fn test_miss_then_hit_fetches_upstream_once() {
    let harness = Harness::new().await;
    harness.catalog.add_item("B", png_poster(40, 60, 1));

    let first = harness.posters.get_image("B").await.unwrap();
    assert_eq!(first.source, PosterSource::Upstream { persisted: true });
    assert_eq!(first.content_type(), "image/jpeg");
    assert_eq!(harness.catalog.gets(), 1);

    let second = harness.posters.get_image("B").await.unwrap();
    assert!(second.is_cache_hit());
    assert_eq!(second.bytes, first.bytes);
    assert_eq!(harness.catalog.gets(), 1);
}

#[tokio::test]
async fn test_cached_poster_survives_upstream_removal_until_reconciled() {
    let harness = Harness::new().await;
    harness.catalog.add_item("B", png_poster(40, 60, 2));
    let original = harness.posters.get_image("B").await.unwrap();

    harness.catalog.remove_item("B");

    let served = harness.posters.get_image("B").await.unwrap();
    assert!(served.is_cache_hit());
    assert_eq!(served.bytes, original.bytes);
}

#[tokio::test]
async fn test_unknown_item_is_not_found_and_not_cached() {
    let harness = Harness::new().await;

    let err = harness.posters.get_image("ghost").await.unwrap_err();
    assert!(matches!(err, PosterError::NotFound { ref item_id } if item_id == "ghost"));
    assert!(harness.sorted_keys().await.is_empty());
}

#[tokio::test]
async fn test_malformed_upstream_bytes_yield_transform_failure() {
    let harness = Harness::new().await;
    harness
        .catalog
        .add_item("broken", b"<html>Unauthorized</html>".to_vec());

    let err = harness.posters.get_image("broken").await.unwrap_err();
    assert!(matches!(err, PosterError::TransformFailure { .. }));
    assert!(!harness.posters.is_cached("broken").await);
}

#[tokio::test]
async fn test_failed_write_still_serves_transformed_bytes() {
    let harness = Harness::new().await;
    harness.catalog.add_item("B", png_poster(40, 60, 3));

    // Pull the directory out from under the store
    std::fs::remove_dir_all(harness.store.root_directory()).unwrap();

    let poster = harness.posters.get_image("B").await.unwrap();
    assert_eq!(poster.source, PosterSource::Upstream { persisted: false });
    assert_eq!(image::guess_format(&poster.bytes).unwrap(), image::ImageFormat::Jpeg);
}

#[tokio::test]
async fn test_unreadable_entry_falls_back_to_upstream() {
    let harness = Harness::new().await;
    harness.catalog.add_item("B", png_poster(40, 60, 4));

    // A directory where the entry file should be makes the read fail with
    // something other than "not found"
    std::fs::create_dir(harness.store.entry_path("B").unwrap()).unwrap();

    let poster = harness.posters.get_image("B").await.unwrap();
    assert!(!poster.is_cache_hit());
    assert_eq!(harness.catalog.gets(), 1);
}

#[tokio::test]
async fn test_refresh_overwrites_existing_entry() {
    let harness = Harness::new().await;
    harness.catalog.add_item("B", png_poster(40, 60, 5));
    let before = harness.posters.get_image("B").await.unwrap();

    harness.catalog.set_image("B", png_poster(40, 60, 200), None);
    let refreshed = harness.posters.refresh("B").await.unwrap();

    assert_ne!(refreshed.bytes, before.bytes);
    assert_eq!(harness.store.read("B").await.unwrap(), refreshed.bytes);
    assert_eq!(harness.sorted_keys().await, vec!["B".to_string()]);
}

#[tokio::test]
async fn test_evict_is_idempotent() {
    let harness = Harness::new().await;
    harness.catalog.add_item("B", png_poster(20, 30, 6));
    harness.posters.get_image("B").await.unwrap();

    assert!(harness.posters.evict("B").await.unwrap());
    assert!(!harness.posters.evict("B").await.unwrap());
    assert!(!harness.posters.is_cached("B").await);
}
