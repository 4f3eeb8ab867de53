use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetcher::RetryPolicy;
use crate::paginator::PaginatorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    8080
}

/// Launchpad translation pages configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Distribution index root (e.g., "https://translations.launchpad.net/ubuntu")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Site root used to absolutize template links
    #[serde(default = "default_site_url")]
    pub site_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Templates per page (default: 300)
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Pause between page requests in milliseconds (default: 800)
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,
    /// Retries on HTTP 429 before the final attempt (default: 4)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff unit in milliseconds; the n-th retry waits unit * 2^(n+1)
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            site_url: default_site_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
        }
    }

    pub fn paginator_config(&self) -> PaginatorConfig {
        PaginatorConfig {
            base_url: self.base_url.clone(),
            site_url: self.site_url.clone(),
            page_size: self.page_size,
            page_delay: Duration::from_millis(self.page_delay_ms),
        }
    }
}

fn default_base_url() -> String {
    "https://translations.launchpad.net/ubuntu".to_string()
}

fn default_site_url() -> String {
    "https://translations.launchpad.net".to_string()
}

fn default_user_agent() -> String {
    format!("ubuntu-l10n/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout() -> u64 {
    30
}

fn default_page_size() -> usize {
    300
}

fn default_page_delay() -> u64 {
    800
}

fn default_max_retries() -> u32 {
    4
}

fn default_backoff_base() -> u64 {
    1000
}

/// On-disk statistics cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Cache document path; `None` resolves to the XDG cache directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Entry lifetime in seconds (default: 3600)
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            ttl_secs: default_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

fn default_ttl() -> u64 {
    3600
}

/// User settings document configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SettingsConfig {
    /// Settings document path; `None` resolves to the XDG config directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.upstream.page_size, 300);
        assert_eq!(config.upstream.page_delay_ms, 800);
        assert_eq!(config.upstream.max_retries, 4);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert!(config.cache.path.is_none());
    }

    #[test]
    fn test_deserialize_upstream_overrides() {
        let toml = r#"
[upstream]
base_url = "http://localhost:9000/ubuntu"
site_url = "http://localhost:9000"
page_size = 50
backoff_base_ms = 10
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.upstream.base_url, "http://localhost:9000/ubuntu");
        assert_eq!(config.upstream.page_size, 50);
        assert_eq!(config.upstream.timeout_secs, 30); // default

        let policy = config.upstream.retry_policy();
        assert_eq!(policy.backoff_base, Duration::from_millis(10));
        assert_eq!(policy.max_retries, 4);
    }

    #[test]
    fn test_deserialize_cache_path() {
        let toml = r#"
[cache]
path = "/tmp/l10n/cache.json"
ttl_secs = 60
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.cache.path.as_deref().and_then(|p| p.to_str()),
            Some("/tmp/l10n/cache.json")
        );
        assert_eq!(config.cache.ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_paginator_config_from_upstream() {
        let upstream = UpstreamConfig::default();
        let paginator = upstream.paginator_config();
        assert_eq!(paginator.page_size, 300);
        assert_eq!(paginator.page_delay, Duration::from_millis(800));
        assert_eq!(paginator.site_url, "https://translations.launchpad.net");
    }

    #[test]
    fn test_default_user_agent_carries_version() {
        let upstream = UpstreamConfig::default();
        assert!(upstream.user_agent.starts_with("ubuntu-l10n/"));
    }
}
