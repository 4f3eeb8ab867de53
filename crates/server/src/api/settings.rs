//! User settings API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use l10n_core::{Settings, SettingsPatch};
use tracing::info;

use super::handlers::ErrorResponse;
use crate::state::AppState;

/// GET /api/v1/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Settings>, impl IntoResponse> {
    match state.settings().load().await {
        Ok(settings) => Ok(Json(settings)),
        Err(e) => Err(ErrorResponse::with_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.to_string(),
        )),
    }
}

/// PUT /api/v1/settings
///
/// Apply the provided flags; omitted flags and unknown keys are kept.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<Settings>, impl IntoResponse> {
    match state.settings().update(&patch).await {
        Ok(settings) => {
            info!(
                first_run_done = settings.first_run_done,
                notifications_enabled = settings.notifications_enabled,
                "Settings updated"
            );
            Ok(Json(settings))
        }
        Err(e) => Err(ErrorResponse::with_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.to_string(),
        )),
    }
}
