//! Catalog reconciliation sweep
//!
//! A sweep brings the poster cache in line with the upstream library:
//!
//! 1. List the library and drop folder entries; what remains is the snapshot.
//! 2. Probe every snapshot item's primary image. Items modified inside the
//!    recency window are evicted and re-fetched. Items with no cache entry
//!    are warmed when enabled.
//! 3. Delete every cache entry whose key is not in the snapshot.
//!
//! Per-item failures are counted and logged; only a failed library listing
//! aborts the sweep.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::services::poster_cache::{PosterCacheService, PosterSource};

/// Tunables for a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub library_id: String,
    pub recency_window: Duration,
    pub probe_concurrency: usize,
    pub warm_missing_entries: bool,
}

impl ReconcileOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            library_id: config.upstream.library_id.clone(),
            recency_window: config.reconcile.recency_window,
            probe_concurrency: config.reconcile.probe_concurrency.max(1),
            warm_missing_entries: config.reconcile.warm_missing_entries,
        }
    }
}

/// Counters for one completed sweep.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReconcileStats {
    pub items_seen: usize,
    pub folders_skipped: usize,
    pub unchanged_count: usize,
    pub updated_count: usize,
    pub warmed_count: usize,
    pub orphan_count: usize,
    pub probe_failures: usize,
    pub refresh_failures: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Unchanged,
    Updated,
    Warmed,
    ProbeFailed,
    RefreshFailed,
}

/// Runs sweeps against the poster cache. At most one sweep runs at a time.
pub struct CatalogReconciler {
    posters: PosterCacheService,
    options: ReconcileOptions,
    run_lock: Mutex<()>,
    last_stats: RwLock<Option<ReconcileStats>>,
}

impl CatalogReconciler {
    pub fn new(posters: PosterCacheService, options: ReconcileOptions) -> Self {
        Self {
            posters,
            options,
            run_lock: Mutex::new(()),
            last_stats: RwLock::new(None),
        }
    }

    /// Stats of the most recent successful sweep.
    pub async fn last_stats(&self) -> Option<ReconcileStats> {
        self.last_stats.read().await.clone()
    }

    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Run one sweep.
    ///
    /// Fails with [`AppError::OperationInProgress`] when another sweep holds
    /// the lock, and with [`AppError::Upstream`] when the library listing fails.
    pub async fn reconcile(&self) -> AppResult<ReconcileStats> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| AppError::operation_in_progress("reconcile", "poster cache"))?;

        let started = Instant::now();
        let started_at = Utc::now();
        info!(
            "Starting poster reconciliation for library {}",
            self.options.library_id
        );

        let items = self
            .posters
            .catalog()
            .list_items(&self.options.library_id)
            .await
            .inspect_err(|e| warn!("Reconciliation aborted, library listing failed: {}", e))?;

        let total = items.len();
        let snapshot: Vec<String> = items
            .into_iter()
            .filter(|item| !item.is_folder)
            .map(|item| item.id)
            .collect();
        let folders_skipped = total - snapshot.len();

        let probes: Vec<_> = snapshot
            .iter()
            .map(|item_id| self.reconcile_item(item_id, started_at))
            .collect();
        let outcomes: Vec<ItemOutcome> = stream::iter(probes)
        .buffer_unordered(self.options.probe_concurrency)
        .collect()
        .await;

        let snapshot_ids: HashSet<&str> = snapshot.iter().map(String::as_str).collect();
        let orphan_count = self.remove_orphans(&snapshot_ids).await;

        let count = |outcome: ItemOutcome| outcomes.iter().filter(|o| **o == outcome).count();
        let stats = ReconcileStats {
            items_seen: snapshot.len(),
            folders_skipped,
            unchanged_count: count(ItemOutcome::Unchanged),
            updated_count: count(ItemOutcome::Updated),
            warmed_count: count(ItemOutcome::Warmed),
            orphan_count,
            probe_failures: count(ItemOutcome::ProbeFailed),
            refresh_failures: count(ItemOutcome::RefreshFailed),
            started_at,
            completed_at: Utc::now(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        info!(
            "Reconciliation complete in {}ms: {} item(s), {} updated, {} warmed, {} orphan(s) removed, {} probe failure(s), {} refresh failure(s)",
            stats.duration_ms,
            stats.items_seen,
            stats.updated_count,
            stats.warmed_count,
            stats.orphan_count,
            stats.probe_failures,
            stats.refresh_failures
        );

        *self.last_stats.write().await = Some(stats.clone());
        Ok(stats)
    }

    async fn reconcile_item(&self, item_id: &str, now: DateTime<Utc>) -> ItemOutcome {
        let probe = match self.posters.catalog().head_image(item_id).await {
            Ok(probe) => probe,
            Err(e) => {
                warn!("Image probe failed for item {}: {}", item_id, e);
                return ItemOutcome::ProbeFailed;
            }
        };

        let recently_modified = probe
            .last_modified
            .is_some_and(|last_modified| is_recent(last_modified, now, self.options.recency_window));

        if recently_modified {
            debug!("Item {} changed upstream, refreshing poster", item_id);
            if let Err(e) = self.posters.evict(item_id).await {
                warn!("Failed to evict stale poster for item {}: {}", item_id, e);
            }
            return self.fetch(item_id, ItemOutcome::Updated).await;
        }

        if self.options.warm_missing_entries && !self.posters.is_cached(item_id).await {
            debug!("Item {} has no cached poster, warming", item_id);
            return self.fetch(item_id, ItemOutcome::Warmed).await;
        }

        ItemOutcome::Unchanged
    }

    async fn fetch(&self, item_id: &str, on_success: ItemOutcome) -> ItemOutcome {
        match self.posters.refresh(item_id).await {
            Ok(poster) if poster.source == (PosterSource::Upstream { persisted: true }) => on_success,
            // Write failure already logged by the service
            Ok(_) => ItemOutcome::RefreshFailed,
            Err(e) => {
                warn!("Poster refresh failed for item {}: {}", item_id, e);
                ItemOutcome::RefreshFailed
            }
        }
    }

    async fn remove_orphans(&self, snapshot: &HashSet<&str>) -> usize {
        let keys = match self.posters.store().list_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Failed to enumerate cached posters, skipping orphan cleanup: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys.iter().filter(|key| !snapshot.contains(key.as_str())) {
            match self.posters.evict(key).await {
                Ok(true) => {
                    debug!("Removed orphaned poster {}", key);
                    removed += 1;
                }
                Ok(false) => {}
                Err(e) => warn!("Failed to remove orphaned poster {}: {}", key, e),
            }
        }
        removed
    }
}

/// Whether `last_modified` falls within `window` before `now`. Timestamps
/// ahead of `now` count as recent.
pub fn is_recent(last_modified: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    let window = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);
    now.signed_duration_since(last_modified) <= window
}
