//! Mock HTTP transport for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::fetcher::{FetchError, HttpResponse, Transport};

type Scripted = Result<HttpResponse, FetchError>;

/// Mock implementation of the Transport trait.
///
/// Responses are scripted per URL. Each call pops the next queued entry for
/// its URL; once the queue is empty the URL's fixed response (if any) is
/// served, otherwise the call fails with a connection error.
///
/// # Example
///
/// ```rust,ignore
/// use l10n_core::testing::MockTransport;
/// use l10n_core::fetcher::HttpResponse;
///
/// let transport = MockTransport::new();
/// transport.push_response(url, HttpResponse::status(429));
/// transport.serve(url, "<html>...</html>");
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    queued: Mutex<HashMap<String, VecDeque<Scripted>>>,
    fixed: Mutex<HashMap<String, HttpResponse>>,
    requests: Mutex<Vec<String>>,
    latency: Mutex<Option<Duration>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot response for `url`.
    pub fn push_response(&self, url: &str, response: HttpResponse) {
        self.queue(url, Ok(response));
    }

    /// Queue a one-shot transport error for `url`.
    pub fn push_error(&self, url: &str, error: FetchError) {
        self.queue(url, Err(error));
    }

    /// Serve `body` with status 200 for `url` whenever nothing is queued.
    pub fn serve(&self, url: &str, body: impl Into<String>) {
        self.fixed
            .lock()
            .unwrap()
            .insert(url.to_string(), HttpResponse::ok(body));
    }

    /// Delay every response by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn queue(&self, url: &str, entry: Scripted) {
        self.queued
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(entry);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());

        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|queue| queue.pop_front());
        if let Some(entry) = queued {
            return entry;
        }

        match self.fixed.lock().unwrap().get(url) {
            Some(response) => Ok(response.clone()),
            None => Err(FetchError::Connection(format!("no mock response for {}", url))),
        }
    }
}
