//! HTTP page retrieval with bounded retry on rate limiting.
//!
//! `Transport` is the raw GET seam (reqwest in production, scripted mocks in
//! tests). `PageFetcher` layers the 429 backoff policy on top of it and knows
//! nothing about page content.

mod page_fetcher;
mod reqwest_transport;

pub use page_fetcher::{PageFetcher, RetryPolicy};
pub use reqwest_transport::ReqwestTransport;

use async_trait::async_trait;
use thiserror::Error;

/// HTTP status that triggers a backoff-and-retry.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Errors that can occur while fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Non-retryable HTTP status.
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    /// The source kept answering 429 after every retry.
    #[error("Rate limited by {url} after {attempts} attempts")]
    RateLimitExhausted { url: String, attempts: u32 },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// A raw HTTP response: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Single HTTP GET without any retry logic.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}
