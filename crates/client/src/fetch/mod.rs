//! Network boundary for intercepted resource requests.
//!
//! ### Response classification
//! - Same-origin final URL: `Basic`
//! - Cross-origin `no-cors` request: `Opaque` (body withheld)
//! - Any other cross-origin response: `Cors`
//!
//! ### Errors
//! HTTP error statuses are returned as responses. Only transport failures
//! (DNS, connect, timeout, oversized body) are errors.

pub mod resource;
pub mod url;

use bytes::Bytes;
use reqwest::{Client, Url, header};
use std::time::{Duration, Instant};

pub use resource::{Destination, RequestMode, ResourceRequest, ResourceResponse, ResponseSource, ResponseType};
pub use self::url::{UrlError, canonicalize, is_http, resolve, same_origin};

use shenbury_core::{AppConfig, Error};

/// Anything able to perform a network fetch for an intercepted request.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "shenbury/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "shenbury/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// HTTP implementation of [`Network`] backed by reqwest.
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
    origin: Url,
}

impl HttpNetwork {
    /// Create a new network client for pages served from `origin`.
    pub fn new(config: FetchConfig, origin: Url) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config, origin })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn classify(&self, request: &ResourceRequest, final_url: &Url) -> ResponseType {
        if same_origin(final_url, &self.origin) {
            ResponseType::Basic
        } else if request.mode == RequestMode::NoCors {
            ResponseType::Opaque
        } else {
            ResponseType::Cors
        }
    }
}

#[async_trait::async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::FetchTimeout(format!("{}: {}", request.url, e))
                } else {
                    Error::HttpError(format!("network error: {}", e))
                }
            })?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let response_type = self.classify(request, &final_url);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::HttpError(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let (headers, body) = if response_type == ResponseType::Opaque {
            (header::HeaderMap::new(), Bytes::new())
        } else {
            (headers, bytes)
        };

        tracing::debug!(
            url = %request.url,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            bytes = body.len(),
            "network fetch complete"
        );

        Ok(ResourceResponse { url: final_url, status, response_type, headers, body, source: ResponseSource::Network })
    }
}
