//! reqwest-backed transport.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{FetchError, HttpResponse, Transport};
use crate::config::UpstreamConfig;

/// Transport issuing real GET requests with a fixed timeout.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self, FetchError> {
        Self::new(&config.user_agent, config.timeout())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        debug!(url, "GET");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else if e.is_connect() {
                FetchError::Connection(e.to_string())
            } else {
                FetchError::Request(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| {
                // The client timeout also covers reading the body
                if e.is_timeout() {
                    FetchError::Timeout(url.to_string())
                } else {
                    FetchError::Body(e.to_string())
                }
            })?;

        Ok(HttpResponse { status, body })
    }
}
