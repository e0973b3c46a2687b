//! Per-request cache policy classification.

use crate::fetch::{Destination, RequestMode, ResourceRequest, is_http, same_origin};
use reqwest::Method;
use url::Url;

/// File extensions treated as images when the destination is not set.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "avif", "svg", "ico"];

/// How a single request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Live fetch first, cached copy only when the network fails.
    NetworkFirst,
    /// Cached copy if present, else fetch and populate.
    CacheFirst,
    /// Never read or written.
    Bypass,
    /// Cache-first, with a placeholder when both cache and network fail.
    ImageFallback,
}

/// Path rules derived from configuration.
#[derive(Debug, Clone)]
pub struct PolicyRules {
    pub origin: Url,
    /// Path prefixes whose responses may be written to the cache.
    pub asset_prefixes: Vec<String>,
    /// Same-origin path prefixes excluded from caching entirely.
    pub bypass_prefixes: Vec<String>,
}

impl PolicyRules {
    /// Whether a URL falls under the cacheable asset namespace.
    pub fn is_cacheable_asset(&self, url: &Url) -> bool {
        self.asset_prefixes.iter().any(|prefix| url.path().starts_with(prefix.as_str()))
    }

    fn is_excluded(&self, url: &Url) -> bool {
        self.bypass_prefixes.iter().any(|prefix| url.path().starts_with(prefix.as_str()))
    }
}

/// Decide the policy for a request.
///
/// Checked in order: method, scheme, origin, excluded paths, navigation, images.
pub fn classify(request: &ResourceRequest, rules: &PolicyRules) -> CachePolicy {
    if request.method != Method::GET || !is_http(&request.url) {
        return CachePolicy::Bypass;
    }
    if !same_origin(&request.url, &rules.origin) || rules.is_excluded(&request.url) {
        return CachePolicy::Bypass;
    }
    if is_navigation(request) {
        return CachePolicy::NetworkFirst;
    }
    if is_image(request) {
        return CachePolicy::ImageFallback;
    }
    CachePolicy::CacheFirst
}

fn is_navigation(request: &ResourceRequest) -> bool {
    request.mode == RequestMode::Navigate
        || request.destination == Destination::Document
        || request.url.path().ends_with(".html")
        || request.accepts_html()
}

fn is_image(request: &ResourceRequest) -> bool {
    if request.destination == Destination::Image {
        return true;
    }
    request
        .url
        .path()
        .rsplit_once('.')
        .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}
