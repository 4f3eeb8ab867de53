//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a scripted transport and an in-memory cache injected, so the whole
//! HTTP surface can be exercised without network access.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use l10n_core::testing::{MemoryCache, MockTransport};
use l10n_core::{
    Config, FetchWorker, PageFetcher, Paginator, PaginatorConfig, RetryPolicy, SettingsStore,
    StatsCache, StatsKey, StatsService,
};
use l10n_server::{create_router, AppState, Session, WsBroadcaster};

/// Re-export fixtures for test convenience
pub use l10n_core::testing::fixtures;

/// Distribution root the scripted transport answers for.
pub const BASE_URL: &str = "http://launchpad.test/ubuntu";

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_load() {
///     let fixture = TestFixture::new();
///     fixture.serve_rows("noble", "sv", &fixtures::numbered_rows(0, 3));
///
///     let response = fixture.post("/api/v1/load", json!({
///         "distro": "noble", "lang": "sv"
///     })).await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Scripted upstream responses
    pub transport: Arc<MockTransport>,
    /// In-memory statistics cache
    pub cache: MemoryCache,
    /// Broadcaster shared with the session
    pub ws_broadcaster: WsBroadcaster,
    /// Temporary directory holding the settings document
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub raw: Vec<u8>,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let transport = Arc::new(MockTransport::new());
        let cache = MemoryCache::new();

        let paginator_config = Self::paginator_config();
        let fetcher = PageFetcher::new(
            Arc::clone(&transport) as Arc<dyn l10n_core::Transport>,
            RetryPolicy {
                max_retries: 0,
                backoff_base: Duration::from_millis(1),
            },
        );
        let service = Arc::new(StatsService::new(
            Paginator::new(fetcher, paginator_config),
            Arc::new(cache.clone()) as Arc<dyn StatsCache>,
            Duration::from_secs(3600),
        ));

        let settings = Arc::new(SettingsStore::new(temp_dir.path().join("config.json")));
        let ws_broadcaster = WsBroadcaster::default();
        let (worker, events) = FetchWorker::channel(service, 64);
        let session = Session::start(
            worker,
            events,
            ws_broadcaster.clone(),
            Arc::clone(&settings),
        );

        let mut config = Config::default();
        config.upstream.base_url = BASE_URL.to_string();
        config.settings.path = Some(temp_dir.path().join("config.json"));

        let state = Arc::new(AppState::new(
            config,
            session,
            settings,
            ws_broadcaster.clone(),
        ));

        Self {
            router: create_router(state),
            transport,
            cache,
            ws_broadcaster,
            temp_dir,
        }
    }

    fn paginator_config() -> PaginatorConfig {
        PaginatorConfig {
            base_url: BASE_URL.to_string(),
            site_url: fixtures::SITE_URL.to_string(),
            page_size: 300,
            page_delay: Duration::ZERO,
        }
    }

    /// URL of the first result page for `distro`/`lang`.
    pub fn page_url(distro: &str, lang: &str) -> String {
        let key = StatsKey::new(distro, lang).unwrap();
        Self::paginator_config().page_url(&key, 0)
    }

    /// Serve a single result page holding `rows`.
    pub fn serve_rows(&self, distro: &str, lang: &str, rows: &[fixtures::PageRow]) {
        self.transport.serve(
            &Self::page_url(distro, lang),
            fixtures::stats_page_html(rows, Some(rows.len())),
        );
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Poll `/api/v1/view` until the session reports `status`.
    pub async fn wait_for_status(&self, status: &str) -> TestResponse {
        for _ in 0..200 {
            let response = self.get("/api/v1/view").await;
            if response.body["status"] == status {
                return response;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session never reached status {}", status);
    }

    /// Start a load and wait until it is applied.
    pub async fn load(&self, distro: &str, lang: &str) -> TestResponse {
        let response = self
            .post(
                "/api/v1/load",
                serde_json::json!({ "distro": distro, "lang": lang }),
            )
            .await;
        assert_eq!(response.status, StatusCode::ACCEPTED);
        self.wait_for_status("ready").await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
            raw: body_bytes.to_vec(),
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
