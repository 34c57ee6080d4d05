//! Health check HTTP handler

use axum::{extract::State, response::IntoResponse};

use crate::web::{
    AppState,
    responses::{HealthResponse, ok},
};

/// Liveness endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = chrono::Utc::now() - state.start_time;
    ok(HealthResponse::healthy(uptime.num_seconds()))
}
