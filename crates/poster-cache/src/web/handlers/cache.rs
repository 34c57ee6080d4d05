//! Cache statistics handler

use std::path::PathBuf;

use axum::{extract::State, response::Response};
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::errors::AppError;
use crate::job_scheduling::calculate_next_scheduled_time;
use crate::services::ReconcileStats;
use crate::web::{AppState, responses::handle_result};

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub entries: usize,
    pub total_bytes: u64,
    pub cache_root: PathBuf,
    pub reconcile_running: bool,
    pub last_reconcile: Option<ReconcileStats>,
    pub next_reconcile: Option<DateTime<Local>>,
}

/// `GET /api/cache/stats`
pub async fn cache_stats(State(state): State<AppState>) -> Response {
    let result = async {
        let store_stats = state.posters.cache_stats().await?;
        Ok::<_, AppError>(CacheStatsResponse {
            entries: store_stats.entries,
            total_bytes: store_stats.total_bytes,
            cache_root: store_stats.root_directory,
            reconcile_running: state.reconciler.is_running(),
            last_reconcile: state.reconciler.last_stats().await,
            next_reconcile: state
                .reconcile_schedule
                .as_deref()
                .and_then(calculate_next_scheduled_time),
        })
    }
    .await;

    handle_result(result)
}
