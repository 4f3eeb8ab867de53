use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use l10n_core::stats::{default_language, Distro, Language, DISTROS, LANGUAGES};
use l10n_core::Config;

use crate::metrics::encode_metrics;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    /// Error body paired with its status, ready to return from a handler.
    pub fn with_status(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                error: error.into(),
            }),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    /// Known languages ordered by display name.
    pub languages: Vec<Language>,
    /// Code preselected from the server's locale.
    pub default: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<Config> {
    Json(state.config().clone())
}

/// GET /api/v1/metrics
///
/// Prometheus text exposition of every registered metric.
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}

/// GET /api/v1/distros
pub async fn list_distros() -> Json<&'static [Distro]> {
    Json(DISTROS)
}

/// GET /api/v1/languages
pub async fn list_languages() -> Json<LanguagesResponse> {
    let mut languages = LANGUAGES.to_vec();
    languages.sort_by(|a, b| a.name.cmp(b.name));

    let locale = pick_locale(std::env::var("LC_ALL").ok(), std::env::var("LANG").ok());

    Json(LanguagesResponse {
        languages,
        default: default_language(locale.as_deref()),
    })
}

/// `LC_ALL` wins over `LANG`; an empty value counts as unset.
fn pick_locale(lc_all: Option<String>, lang: Option<String>) -> Option<String> {
    lc_all
        .filter(|v| !v.is_empty())
        .or_else(|| lang.filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_locale_prefers_lc_all() {
        assert_eq!(
            pick_locale(Some("de_DE.UTF-8".into()), Some("sv_SE.UTF-8".into())),
            Some("de_DE.UTF-8".to_string())
        );
    }

    #[test]
    fn test_pick_locale_skips_empty_lc_all() {
        let locale = pick_locale(Some(String::new()), Some("fi_FI.UTF-8".into()));
        assert_eq!(locale.as_deref(), Some("fi_FI.UTF-8"));
        assert_eq!(default_language(locale.as_deref()), "fi");
    }

    #[test]
    fn test_pick_locale_all_empty() {
        assert_eq!(pick_locale(Some(String::new()), Some(String::new())), None);
        assert_eq!(pick_locale(None, None), None);
    }
}
