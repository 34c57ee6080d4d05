//! Poster serving handler

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::errors::PosterError;
use crate::web::{AppState, responses::ApiResponse};

/// `GET /api/images/{item_id}`
///
/// Serves the transformed poster with `X-Cache: HIT` or `MISS`. Every
/// failure is reported as 404 so clients fall back to a placeholder.
pub async fn get_poster(State(state): State<AppState>, Path(item_id): Path<String>) -> Response {
    match state.posters.get_image(&item_id).await {
        Ok(poster) => {
            let cache_status = if poster.is_cache_hit() { "HIT" } else { "MISS" };
            let cache_control = format!("public, max-age={}", state.image_max_age.as_secs());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, poster.content_type().to_string()),
                    (header::CACHE_CONTROL, cache_control),
                    (header::HeaderName::from_static("x-cache"), cache_status.to_string()),
                ],
                poster.bytes,
            )
                .into_response()
        }
        Err(e) => {
            match &e {
                PosterError::NotFound { .. } => debug!("{}", e),
                _ => warn!("Failed to serve poster: {}", e),
            }
            (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error(format!(
                    "Poster for item '{item_id}' is unavailable"
                ))),
            )
                .into_response()
        }
    }
}
