//! GET with exponential backoff on HTTP 429.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use super::{FetchError, HttpResponse, Transport, STATUS_TOO_MANY_REQUESTS};
use crate::metrics::{RATE_LIMIT_RETRIES, UPSTREAM_REQUESTS};

/// Backoff policy for rate-limited responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts that may be retried after a 429. One final attempt follows.
    pub max_retries: u32,
    /// The n-th retry (0-based) waits `backoff_base * 2^(n+1)`.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th rate-limited response (2s, 4s, 8s, 16s by default).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt + 1)
    }
}

/// Fetches page bodies, retrying only on rate limiting.
///
/// Any other non-success status fails immediately; transport errors
/// (timeouts, refused connections) are not retried either.
#[derive(Clone)]
pub struct PageFetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl PageFetcher {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// GET `url` and return the body.
    pub async fn get(&self, url: &str) -> Result<String, FetchError> {
        for attempt in 0..self.policy.max_retries {
            let response = self.send(url).await?;
            if response.status == STATUS_TOO_MANY_REQUESTS {
                let delay = self.policy.delay_for(attempt);
                warn!(
                    url,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "rate limited, backing off"
                );
                RATE_LIMIT_RETRIES.inc();
                sleep(delay).await;
                continue;
            }
            return into_body(url, response);
        }

        // Final attempt; whatever happens here is surfaced as-is
        let response = self.send(url).await?;
        if response.status == STATUS_TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimitExhausted {
                url: url.to_string(),
                attempts: self.policy.max_retries + 1,
            });
        }
        into_body(url, response)
    }

    async fn send(&self, url: &str) -> Result<HttpResponse, FetchError> {
        match self.transport.get(url).await {
            Ok(response) => {
                let outcome = match response.status {
                    STATUS_TOO_MANY_REQUESTS => "rate_limited",
                    _ if response.is_success() => "success",
                    _ => "http_error",
                };
                UPSTREAM_REQUESTS.with_label_values(&[outcome]).inc();
                debug!(url, status = response.status, "upstream response");
                Ok(response)
            }
            Err(e) => {
                UPSTREAM_REQUESTS.with_label_values(&["transport_error"]).inc();
                Err(e)
            }
        }
    }
}

fn into_body(url: &str, response: HttpResponse) -> Result<String, FetchError> {
    if response.is_success() {
        Ok(response.body)
    } else {
        Err(FetchError::Http {
            url: url.to_string(),
            status: response.status,
        })
    }
}
