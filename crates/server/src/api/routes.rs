use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{cache, handlers, middleware::metrics_middleware, settings, stats, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Known releases and languages
        .route("/distros", get(handlers::list_distros))
        .route("/languages", get(handlers::list_languages))
        // User settings
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        // Session (background load, browsing, export)
        .route("/load", post(stats::load))
        .route("/view", get(stats::get_view))
        .route("/summary", get(stats::get_summary))
        .route("/export", get(stats::export_records))
        // Direct fetch
        .route("/stats/{distro}/{lang}", get(stats::fetch_stats))
        // Cache
        .route("/cache", delete(cache::clear_cache))
        // Live updates
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
