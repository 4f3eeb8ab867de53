//! Statistics API handlers: loading, browsing, summarizing and exporting.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use l10n_core::aggregate::{
    least_translated, low_translated, top_translated, view, DEFAULT_TOP_N,
    LOW_TRANSLATION_THRESHOLD,
};
use l10n_core::stats::{find_distro, find_language, CompletionClass};
use l10n_core::{
    export, ExportFormat, FetchProgress, FetchResult, HeatLevel, PackageStat, Rollup, SortKey,
    StatsError, StatsKey,
};

use super::handlers::ErrorResponse;
use crate::session::SessionStatus;
use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoadRequest {
    pub distro: String,
    pub lang: String,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct LoadResponse {
    pub generation: u64,
    pub key: StatsKey,
}

#[derive(Debug, Deserialize)]
pub struct ViewParams {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub sort: Option<String>,
}

/// A package row with the values the list and heatmap views derive from it.
#[derive(Debug, Serialize)]
pub struct PackageView {
    #[serde(flatten)]
    pub stat: PackageStat,
    pub translated: u64,
    pub completion_class: CompletionClass,
    pub heat_level: HeatLevel,
}

impl From<&PackageStat> for PackageView {
    fn from(stat: &PackageStat) -> Self {
        Self {
            translated: stat.translated(),
            completion_class: stat.completion_class(),
            heat_level: HeatLevel::from_percent(stat.translated_pct),
            stat: stat.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub status: SessionStatus,
    pub generation: u64,
    pub requested: Option<StatsKey>,
    pub loaded: Option<StatsKey>,
    pub progress: Option<FetchProgress>,
    pub from_cache: bool,
    pub cache_age_minutes: u64,
    pub error: Option<String>,
    pub query: String,
    pub sort: SortKey,
    /// Roll-up of every loaded package, ignoring the filter.
    pub rollup: Rollup,
    pub packages: Vec<PackageView>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    #[serde(default = "default_top")]
    pub top: usize,
}

fn default_top() -> usize {
    DEFAULT_TOP_N
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub key: Option<StatsKey>,
    pub rollup: Rollup,
    pub top_translated: Vec<PackageStat>,
    pub least_translated: Vec<PackageStat>,
    /// Packages started but below the low-translation threshold.
    pub low_translated: usize,
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FetchParams {
    #[serde(default)]
    pub force: bool,
}

/// Validate a (distro, lang) pair against the known releases and languages.
fn resolve_key(distro: &str, lang: &str) -> Result<StatsKey, ApiError> {
    let key = StatsKey::new(distro, lang)
        .map_err(|e| ErrorResponse::with_status(StatusCode::BAD_REQUEST, e.to_string()))?;
    if find_distro(&key.distro).is_none() {
        return Err(ErrorResponse::with_status(
            StatusCode::BAD_REQUEST,
            format!("Unknown distribution: {}", key.distro),
        ));
    }
    if find_language(&key.lang).is_none() {
        return Err(ErrorResponse::with_status(
            StatusCode::BAD_REQUEST,
            format!("Unknown language: {}", key.lang),
        ));
    }
    Ok(key)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/load
///
/// Start loading a result set in the background. Progress and the outcome
/// arrive over the WebSocket and in `GET /view`.
pub async fn load(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoadRequest>,
) -> Result<(StatusCode, Json<LoadResponse>), ApiError> {
    let key = resolve_key(&request.distro, &request.lang)?;
    let generation = state.session().load(key.clone(), request.force).await;
    info!(key = %key, generation, force = request.force, "Load requested");
    Ok((StatusCode::ACCEPTED, Json(LoadResponse { generation, key })))
}

/// GET /api/v1/view
///
/// Session status plus the loaded packages filtered by `query` and ordered
/// by `sort` (default `name_asc`).
pub async fn get_view(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ViewParams>,
) -> Result<Json<ViewResponse>, ApiError> {
    let sort = match params.sort.as_deref() {
        None | Some("") => SortKey::default(),
        Some(raw) => raw
            .parse()
            .map_err(|e: l10n_core::aggregate::UnknownSortKey| {
                ErrorResponse::with_status(StatusCode::BAD_REQUEST, e.to_string())
            })?,
    };

    let snapshot = state.session().snapshot().await;
    let packages = view(&snapshot.records, &params.query, sort)
        .into_iter()
        .map(PackageView::from)
        .collect();

    Ok(Json(ViewResponse {
        status: snapshot.status,
        generation: snapshot.generation,
        requested: snapshot.requested,
        loaded: snapshot.loaded,
        progress: snapshot.progress,
        from_cache: snapshot.from_cache,
        cache_age_minutes: snapshot.cache_age_minutes,
        error: snapshot.error,
        query: params.query,
        sort,
        rollup: Rollup::compute(&snapshot.records),
        packages,
    }))
}

/// GET /api/v1/summary
///
/// Language statistics for the loaded result set.
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SummaryParams>,
) -> Json<SummaryResponse> {
    let snapshot = state.session().snapshot().await;
    let records = snapshot.records.as_slice();

    Json(SummaryResponse {
        key: snapshot.loaded,
        rollup: Rollup::compute(records),
        top_translated: top_translated(records, params.top)
            .into_iter()
            .cloned()
            .collect(),
        least_translated: least_translated(records, params.top)
            .into_iter()
            .cloned()
            .collect(),
        low_translated: low_translated(records, LOW_TRANSLATION_THRESHOLD).len(),
    })
}

/// GET /api/v1/export
///
/// Download the loaded records as CSV (default) or JSON.
pub async fn export_records(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportParams>,
) -> Result<Response, ApiError> {
    let format = match params.format.as_deref() {
        None | Some("") => ExportFormat::Csv,
        Some(raw) => raw
            .parse::<ExportFormat>()
            .map_err(|e| ErrorResponse::with_status(StatusCode::BAD_REQUEST, e.to_string()))?,
    };

    let snapshot = state.session().snapshot().await;
    if snapshot.records.is_empty() {
        return Err(ErrorResponse::with_status(
            StatusCode::NOT_FOUND,
            "No statistics loaded",
        ));
    }

    let body = export(&snapshot.records, format).map_err(|e| {
        ErrorResponse::with_status(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    let disposition = format!("attachment; filename=\"{}\"", format.default_file_name());

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// GET /api/v1/stats/{distro}/{lang}
///
/// Fetch one result set synchronously, bypassing the session.
pub async fn fetch_stats(
    State(state): State<Arc<AppState>>,
    Path((distro, lang)): Path<(String, String)>,
    Query(params): Query<FetchParams>,
) -> Result<Json<FetchResult>, ApiError> {
    let key = resolve_key(&distro, &lang)?;

    match state
        .service()
        .fetch(&key, params.force, &|_| {}, &|_, _| {})
        .await
    {
        Ok(result) => Ok(Json(result)),
        Err(StatsError::Fetch(e)) => {
            warn!(key = %key, error = %e, "Statistics fetch failed");
            Err(ErrorResponse::with_status(
                StatusCode::BAD_GATEWAY,
                e.to_string(),
            ))
        }
        Err(e) => Err(ErrorResponse::with_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.to_string(),
        )),
    }
}
