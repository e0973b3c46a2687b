//! Resource cache controller.
//!
//! Intercepts outgoing resource requests and serves them per [`CachePolicy`],
//! owning exactly one cache generation.
//!
//! ### Lifecycle
//! `Parsed → Installing → Installed → Activating → Activated`, or `Redundant`
//! when the generation's store cannot be opened. Install precaches the
//! manifest best-effort. Activation deletes every other generation's store
//! before the controller starts intercepting, so nothing is ever served from a
//! superseded generation.
//!
//! ### Cache writes
//! Writes during `handle` are spawned and never delay the response. Failures
//! are logged. [`ResourceCacheController::settle`] awaits outstanding writes.

pub mod policy;

pub use policy::{CachePolicy, PolicyRules, classify};

use std::sync::Arc;

use futures_util::future::join_all;
use reqwest::StatusCode;
use shenbury_core::{AppConfig, Error, ResourceStore};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use url::Url;

use crate::fetch::{Network, ResourceRequest, ResourceResponse, ResponseSource, canonicalize, resolve};

/// Served for an image when neither cache nor network can provide it and no
/// placeholder was precached.
const PLACEHOLDER_SVG: &[u8] = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="300" viewBox="0 0 400 300">"#,
    r##"<rect width="400" height="300" fill="#1a1a1a"/>"##,
    r##"<text x="200" y="155" fill="#c9a96e" font-family="serif" font-size="18" text-anchor="middle">"##,
    "Image unavailable</text></svg>",
)
.as_bytes();

const OFFLINE_BODY: &str = "Service Unavailable";

/// Lifecycle state of a cache generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Parsed,
    Installing,
    Installed,
    Activating,
    /// Intercepting requests.
    Activated,
    /// Install failed; requests pass straight through.
    Redundant,
}

/// Controller settings for one generation.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Store name owned by this generation.
    pub cache_name: String,
    /// Root-relative URLs fetched into the store on install.
    pub precache: Vec<String>,
    /// Root-relative URL of the placeholder image.
    pub placeholder_image: String,
    pub rules: PolicyRules,
}

impl WorkerConfig {
    /// Build controller settings from application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = canonicalize(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            cache_name: config.cache_name(),
            precache: config.precache_urls.clone(),
            placeholder_image: config.placeholder_image.clone(),
            rules: PolicyRules {
                origin,
                asset_prefixes: config.asset_prefixes.clone(),
                bypass_prefixes: config.bypass_prefixes.clone(),
            },
        })
    }
}

/// Outcome of precaching the install manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub cache_name: String,
    /// URLs written to the store.
    pub cached: Vec<String>,
    /// Manifest entries that could not be cached, with the reason.
    pub failed: Vec<(String, String)>,
    /// Whether the root document made it into the store.
    pub offline_ready: bool,
}

/// Outcome of activating a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub cache_name: String,
    /// Stores of superseded generations that were deleted.
    pub deleted: Vec<String>,
}

/// Intercepts resource requests for one cache generation.
pub struct ResourceCacheController {
    config: WorkerConfig,
    store: Arc<dyn ResourceStore>,
    network: Arc<dyn Network>,
    state: RwLock<Lifecycle>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl ResourceCacheController {
    pub fn new(config: WorkerConfig, store: Arc<dyn ResourceStore>, network: Arc<dyn Network>) -> Self {
        Self { config, store, network, state: RwLock::new(Lifecycle::Parsed), pending: Mutex::new(Vec::new()) }
    }

    /// Create a controller for the generation named in `config`.
    pub fn from_config(
        config: &AppConfig, store: Arc<dyn ResourceStore>, network: Arc<dyn Network>,
    ) -> Result<Self, Error> {
        Ok(Self::new(WorkerConfig::from_app_config(config)?, store, network))
    }

    pub fn cache_name(&self) -> &str {
        &self.config.cache_name
    }

    pub async fn state(&self) -> Lifecycle {
        *self.state.read().await
    }

    /// Install then immediately activate, without waiting for open pages to close.
    pub async fn start(&self) -> Result<(InstallReport, ActivationReport), Error> {
        let installed = self.install().await?;
        let activated = self.activate().await?;
        Ok((installed, activated))
    }

    /// Open this generation's store and precache the manifest.
    ///
    /// Each manifest entry is fetched independently; failures are reported,
    /// not fatal. Only a store that cannot be opened fails the install.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(Lifecycle::Parsed, Lifecycle::Installing).await?;

        if let Err(e) = self.store.open_store(&self.config.cache_name).await {
            tracing::error!(cache = %self.config.cache_name, error = %e, "failed to open cache store; install aborted");
            *self.state.write().await = Lifecycle::Redundant;
            return Err(e);
        }

        let results = join_all(self.config.precache.iter().map(|path| self.precache_one(path))).await;

        let mut report = InstallReport {
            cache_name: self.config.cache_name.clone(),
            cached: Vec::new(),
            failed: Vec::new(),
            offline_ready: false,
        };

        for (path, result) in self.config.precache.iter().zip(results) {
            match result {
                Ok(url) => {
                    if path == "/" {
                        report.offline_ready = true;
                    }
                    report.cached.push(url.to_string());
                }
                Err(e) if path == "/" => {
                    tracing::error!(error = %e, "root document not precached; site will not load offline");
                    report.failed.push((path.clone(), e.to_string()));
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "skipping manifest entry");
                    report.failed.push((path.clone(), e.to_string()));
                }
            }
        }

        *self.state.write().await = Lifecycle::Installed;
        tracing::info!(
            cache = %self.config.cache_name,
            cached = report.cached.len(),
            failed = report.failed.len(),
            "cache generation installed"
        );

        Ok(report)
    }

    async fn precache_one(&self, path: &str) -> Result<Url, Error> {
        let url = resolve(&self.config.rules.origin, path).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let response = self.network.fetch(&ResourceRequest::get(url.clone())).await?;

        if !response.is_cacheable() {
            return Err(Error::HttpError(format!(
                "status {} ({:?})",
                response.status.as_u16(),
                response.response_type
            )));
        }

        self.store.put_entry(&self.config.cache_name, &response.to_stored(&url)).await?;
        Ok(url)
    }

    /// Delete every other generation's store, then start intercepting.
    ///
    /// If enumeration or deletion fails the controller stays `Installed` and
    /// activation can be retried.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        self.transition(Lifecycle::Installed, Lifecycle::Activating).await?;

        match self.purge_stale_generations().await {
            Ok(deleted) => {
                *self.state.write().await = Lifecycle::Activated;
                tracing::info!(cache = %self.config.cache_name, deleted = ?deleted, "cache generation activated");
                Ok(ActivationReport { cache_name: self.config.cache_name.clone(), deleted })
            }
            Err(e) => {
                *self.state.write().await = Lifecycle::Installed;
                tracing::warn!(cache = %self.config.cache_name, error = %e, "activation failed");
                Err(e)
            }
        }
    }

    async fn purge_stale_generations(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.store.store_names().await? {
            if name != self.config.cache_name && self.store.delete_store(&name).await? {
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Serve an intercepted request.
    ///
    /// Errors only for requests that neither the cache nor a fallback can
    /// answer: bypassed and cache-first requests whose network fetch fails.
    pub async fn handle(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error> {
        if self.state().await != Lifecycle::Activated {
            return self.network.fetch(request).await;
        }

        let policy = classify(request, &self.config.rules);
        tracing::debug!(url = %request.url, ?policy, "intercepted fetch");

        match policy {
            CachePolicy::Bypass => self.network.fetch(request).await,
            CachePolicy::NetworkFirst => Ok(self.network_first(request).await),
            CachePolicy::CacheFirst => self.cache_first(request).await,
            CachePolicy::ImageFallback => Ok(self.image_fallback(request).await),
        }
    }

    async fn network_first(&self, request: &ResourceRequest) -> ResourceResponse {
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.cache_in_background(&request.url, &response).await;
                }
                response
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "navigation fetch failed; trying cache");
                match self.lookup(&request.url).await {
                    Some(cached) => cached,
                    None => ResourceResponse::synthetic(
                        request.url.clone(),
                        StatusCode::SERVICE_UNAVAILABLE,
                        "text/plain; charset=utf-8",
                        OFFLINE_BODY,
                    ),
                }
            }
        }
    }

    async fn cache_first(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error> {
        if let Some(cached) = self.lookup(&request.url).await {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(cached);
        }

        let response = self.network.fetch(request).await?;
        if response.is_cacheable() && self.config.rules.is_cacheable_asset(&request.url) {
            self.cache_in_background(&request.url, &response).await;
        }
        Ok(response)
    }

    async fn image_fallback(&self, request: &ResourceRequest) -> ResourceResponse {
        if let Some(cached) = self.lookup(&request.url).await {
            return cached;
        }

        match self.network.fetch(request).await {
            Ok(response) if response.status.is_success() => {
                if response.is_cacheable() && self.config.rules.is_cacheable_asset(&request.url) {
                    self.cache_in_background(&request.url, &response).await;
                }
                response
            }
            Ok(response) => {
                tracing::warn!(url = %request.url, status = response.status.as_u16(), "image unavailable; serving placeholder");
                self.placeholder(request).await
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "image fetch failed; serving placeholder");
                self.placeholder(request).await
            }
        }
    }

    async fn placeholder(&self, request: &ResourceRequest) -> ResourceResponse {
        if let Ok(url) = resolve(&self.config.rules.origin, &self.config.placeholder_image)
            && let Some(mut cached) = self.lookup(&url).await
        {
            cached.source = ResponseSource::Fallback;
            return cached;
        }

        ResourceResponse::synthetic(request.url.clone(), StatusCode::OK, "image/svg+xml", PLACEHOLDER_SVG)
    }

    /// Read the current generation's copy of `url`.
    ///
    /// A failing store is treated as a miss.
    async fn lookup(&self, url: &Url) -> Option<ResourceResponse> {
        match self.store.match_entry(&self.config.cache_name, "GET", identity(url).as_str()).await {
            Ok(Some(stored)) => ResourceResponse::from_stored(stored),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "cache store unavailable; using network");
                None
            }
        }
    }

    async fn cache_in_background(&self, url: &Url, response: &ResourceResponse) {
        let store = Arc::clone(&self.store);
        let cache_name = self.config.cache_name.clone();
        let entry = response.to_stored(&identity(url));

        let handle = tokio::spawn(async move {
            match store.put_entry(&cache_name, &entry).await {
                Ok(()) => tracing::debug!(cache = %cache_name, url = %entry.url, "cached response"),
                Err(e) => tracing::warn!(cache = %cache_name, url = %entry.url, error = %e, "cache write failed"),
            }
        });

        let mut pending = self.pending.lock().await;
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for every cache write spawned so far.
    pub async fn settle(&self) {
        let handles = std::mem::take(&mut *self.pending.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "cache write task did not complete");
            }
        }
    }

    async fn transition(&self, from: Lifecycle, to: Lifecycle) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if *state != from {
            return Err(Error::InvalidState(format!("cannot enter {to:?} from {:?}", *state)));
        }
        *state = to;
        Ok(())
    }
}

/// Request identity used as the cache key: the URL without its fragment.
fn identity(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}
