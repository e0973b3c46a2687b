//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHENBURY_*)
//! 2. TOML config file (if SHENBURY_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHENBURY_*)
/// 2. TOML config file (if SHENBURY_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding the cache stores.
    ///
    /// Set via SHENBURY_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the storefront. Requests to any other origin bypass the cache.
    ///
    /// Set via SHENBURY_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix shared by every cache store name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Current cache generation label.
    ///
    /// Bump this whenever cached content changes meaningfully.
    /// Set via SHENBURY_GENERATION environment variable.
    #[serde(default = "default_generation")]
    pub generation: String,

    /// Root-relative URLs fetched into the store on install.
    #[serde(default = "default_precache_urls")]
    pub precache_urls: Vec<String>,

    /// Path prefixes whose successful responses may be cached.
    #[serde(default = "default_asset_prefixes")]
    pub asset_prefixes: Vec<String>,

    /// Same-origin path prefixes that are never read from or written to the cache.
    #[serde(default = "default_bypass_prefixes")]
    pub bypass_prefixes: Vec<String>,

    /// Root-relative URL of the image served when an image cannot be loaded.
    #[serde(default = "default_placeholder_image")]
    pub placeholder_image: String,

    /// User-Agent string for network fetches.
    ///
    /// Set via SHENBURY_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Transport-level request timeout in milliseconds.
    ///
    /// Set via SHENBURY_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes accepted per response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Freshness window of read-through values in milliseconds.
    ///
    /// Set via SHENBURY_VALUE_TTL_MS environment variable.
    #[serde(default = "default_value_ttl_ms")]
    pub value_ttl_ms: u64,

    /// How long to wait for the remote provider to become ready, in milliseconds.
    #[serde(default = "default_provider_ready_timeout_ms")]
    pub provider_ready_timeout_ms: u64,

    /// Price endpoint returning `{ "<asset>": { "usd": <price> } }`.
    #[serde(default = "default_price_url")]
    pub price_url: String,

    /// Fixed token reference price in USD.
    #[serde(default = "default_reference_price")]
    pub reference_price: f64,

    /// Quote price used when the price source cannot be reached.
    #[serde(default = "default_fallback_price")]
    pub fallback_price: f64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shenbury-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_cache_prefix() -> String {
    "shenbury".into()
}

fn default_generation() -> String {
    "v6".into()
}

fn default_precache_urls() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), default_placeholder_image()]
}

fn default_asset_prefixes() -> Vec<String> {
    vec!["/assets/".into(), "/js/".into(), "/css/".into()]
}

fn default_bypass_prefixes() -> Vec<String> {
    vec!["/api/".into()]
}

fn default_placeholder_image() -> String {
    "/assets/images/placeholder.svg".into()
}

fn default_user_agent() -> String {
    "shenbury/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_value_ttl_ms() -> u64 {
    10_000
}

fn default_provider_ready_timeout_ms() -> u64 {
    5_000
}

fn default_price_url() -> String {
    "https://api.coingecko.com/api/v3/simple/price?ids=tron&vs_currencies=usd".into()
}

fn default_reference_price() -> f64 {
    0.10
}

fn default_fallback_price() -> f64 {
    0.14
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            generation: default_generation(),
            precache_urls: default_precache_urls(),
            asset_prefixes: default_asset_prefixes(),
            bypass_prefixes: default_bypass_prefixes(),
            placeholder_image: default_placeholder_image(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            value_ttl_ms: default_value_ttl_ms(),
            provider_ready_timeout_ms: default_provider_ready_timeout_ms(),
            price_url: default_price_url(),
            reference_price: default_reference_price(),
            fallback_price: default_fallback_price(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Freshness window of the read-through store.
    pub fn value_ttl(&self) -> Duration {
        Duration::from_millis(self.value_ttl_ms)
    }

    /// Deadline for the provider readiness handshake.
    pub fn provider_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_ready_timeout_ms)
    }

    /// Name of the cache store owned by the current generation.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.generation)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHENBURY_`
    /// 2. TOML file from `SHENBURY_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHENBURY_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHENBURY_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./shenbury-cache.sqlite"));
        assert_eq!(config.cache_name(), "shenbury-v6");
        assert_eq!(config.precache_urls, vec!["/", "/index.html", "/assets/images/placeholder.svg"]);
        assert_eq!(config.value_ttl_ms, 10_000);
        assert_eq!(config.provider_ready_timeout_ms, 5_000);
        assert_eq!(config.reference_price, 0.10);
        assert_eq!(config.fallback_price, 0.14);
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.value_ttl(), Duration::from_secs(10));
        assert_eq!(config.provider_ready_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("shenbury.toml", "generation = \"v7\"\nvalue_ttl_ms = 2500\n")?;
            jail.set_env("SHENBURY_CONFIG_FILE", "shenbury.toml");
            jail.set_env("SHENBURY_GENERATION", "v8");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.generation, "v8");
            assert_eq!(config.value_ttl_ms, 2500);
            assert_eq!(config.cache_name(), "shenbury-v8");
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SHENBURY_VALUE_TTL_MS", "0");
            let result = AppConfig::load();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "value_ttl_ms"));
            Ok(())
        });
    }
}
