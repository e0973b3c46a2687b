//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_prefix`, `generation` or `user_agent` is empty
    /// - `origin` is not an http(s) URL
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `value_ttl_ms` is 0
    /// - a price is not a positive finite number
    /// - `placeholder_image` or a precache entry is not root-relative
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_prefix.is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }
        if self.generation.is_empty() {
            return Err(invalid("generation", "must not be empty"));
        }

        if !(self.origin.starts_with("http://") || self.origin.starts_with("https://")) {
            return Err(invalid("origin", "must be an http:// or https:// URL"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.value_ttl_ms == 0 {
            return Err(invalid("value_ttl_ms", "must be greater than 0"));
        }

        for (field, price) in [("reference_price", self.reference_price), ("fallback_price", self.fallback_price)] {
            if !price.is_finite() || price <= 0.0 {
                return Err(invalid(field, "must be a positive number"));
            }
        }

        if !self.placeholder_image.starts_with('/') {
            return Err(invalid("placeholder_image", "must be a root-relative path"));
        }
        if let Some(url) = self.precache_urls.iter().find(|u| !u.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "precache_urls".into(),
                reason: format!("{url} is not a root-relative path"),
            });
        }

        if !self.precache_urls.iter().any(|u| u == "/") {
            tracing::warn!(
                precache_count = self.precache_urls.len(),
                "precache_urls does not include the root document; \
                 the site will not be available offline"
            );
        }

        Ok(())
    }
}
