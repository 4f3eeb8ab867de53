//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Upstream fetching (requests, rate-limit backoffs, pages)
//! - Cache lookups
//! - End-to-end stats fetches

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Upstream
// =============================================================================

/// Upstream HTTP requests by outcome.
pub static UPSTREAM_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "l10n_upstream_requests_total",
            "Total HTTP requests sent to the statistics source",
        ),
        &["outcome"], // "success", "rate_limited", "http_error", "transport_error"
    )
    .unwrap()
});

/// Backoff sleeps taken after a 429 response.
pub static RATE_LIMIT_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "l10n_rate_limit_retries_total",
        "Total retries after a rate-limited response",
    )
    .unwrap()
});

/// Result pages fetched and parsed.
pub static PAGES_FETCHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("l10n_pages_fetched_total", "Total result pages fetched").unwrap()
});

// =============================================================================
// Cache and service
// =============================================================================

/// Cache lookups by result.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("l10n_cache_lookups_total", "Total stats cache lookups"),
        &["result"], // "hit", "stale", "miss", "bypass"
    )
    .unwrap()
});

/// Duration of a full stats fetch, by source.
pub static FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "l10n_fetch_duration_seconds",
            "Duration of a stats fetch including all pages",
        )
        .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["source"], // "cache", "network"
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(UPSTREAM_REQUESTS.clone()),
        Box::new(RATE_LIMIT_RETRIES.clone()),
        Box::new(PAGES_FETCHED.clone()),
        Box::new(CACHE_LOOKUPS.clone()),
        Box::new(FETCH_DURATION.clone()),
    ]
}
