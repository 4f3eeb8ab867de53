use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Page size and cache TTL are positive
/// - Upstream URLs are absolute http(s) URLs
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.upstream.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "upstream.page_size cannot be 0".to_string(),
        ));
    }

    if config.cache.ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "cache.ttl_secs cannot be 0".to_string(),
        ));
    }

    for (field, value) in [
        ("upstream.base_url", &config.upstream.base_url),
        ("upstream.site_url", &config.upstream.site_url),
    ] {
        match reqwest::Url::parse(value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be an absolute http(s) URL, got {:?}",
                    field, value
                )));
            }
        }
    }

    Ok(())
}
