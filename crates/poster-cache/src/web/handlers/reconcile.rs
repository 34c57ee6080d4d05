//! Manual reconciliation trigger

use axum::{extract::State, response::Response};
use tracing::info;

use crate::web::{AppState, responses::handle_result};

/// `POST /api/reconcile`
///
/// Runs a sweep to completion and returns its stats. Answers 409 when a
/// sweep is already running and 502 when the catalog listing fails.
pub async fn trigger_reconcile(State(state): State<AppState>) -> Response {
    info!("Manual reconciliation requested");
    handle_result(state.reconciler.reconcile().await)
}
