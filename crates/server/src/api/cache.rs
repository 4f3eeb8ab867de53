//! Cache API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use super::handlers::{ErrorResponse, SuccessResponse};
use crate::state::AppState;

/// DELETE /api/v1/cache
///
/// Drop every cached result set. Records already loaded in the session stay.
pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SuccessResponse>, impl IntoResponse> {
    match state.service().clear_cache().await {
        Ok(()) => Ok(Json(SuccessResponse {
            message: "Cache cleared".to_string(),
        })),
        Err(e) => Err(ErrorResponse::with_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.to_string(),
        )),
    }
}
