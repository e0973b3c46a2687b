//! Request and response types crossing the fetch-interception boundary.

use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use shenbury_core::StoredResponse;
use url::Url;

/// What the requesting page intends to do with the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    Empty,
}

/// Request mode as set by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Top-level navigation.
    Navigate,
    SameOrigin,
    /// Cross-origin request whose response body the page cannot read.
    NoCors,
    Cors,
}

/// An intercepted outgoing request.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub method: Method,
    pub url: Url,
    pub destination: Destination,
    pub mode: RequestMode,
    pub headers: HeaderMap,
}

impl ResourceRequest {
    /// A plain GET subresource request.
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, destination: Destination::Empty, mode: RequestMode::Cors, headers: HeaderMap::new() }
    }

    /// A top-level page navigation.
    pub fn navigate(url: Url) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml"));
        Self { method: Method::GET, url, destination: Destination::Document, mode: RequestMode::Navigate, headers }
    }

    /// An `<img>` load.
    pub fn image(url: Url) -> Self {
        Self { method: Method::GET, url, destination: Destination::Image, mode: RequestMode::NoCors, headers: HeaderMap::new() }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Whether the `Accept` header asks for HTML.
    pub fn accepts_html(&self) -> bool {
        self.headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|accept| accept.contains("text/html"))
    }
}

/// Visibility class of a response, mirroring what the page may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// Same-origin response.
    Basic,
    /// Cross-origin response readable through CORS.
    Cors,
    /// Cross-origin response with a withheld body.
    Opaque,
    /// Synthesized locally.
    Default,
}

/// Where a response handed back to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    /// A locally built substitute (offline page, placeholder image).
    Fallback,
}

/// A response returned to the page.
#[derive(Debug, Clone)]
pub struct ResourceResponse {
    pub url: Url,
    pub status: StatusCode,
    pub response_type: ResponseType,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl ResourceResponse {
    /// A locally synthesized response.
    pub fn synthetic(url: Url, status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self {
            url,
            status,
            response_type: ResponseType::Default,
            headers,
            body: body.into(),
            source: ResponseSource::Fallback,
        }
    }

    /// Whether this response may be written to the cache: HTTP 200 and same-origin.
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK && self.response_type == ResponseType::Basic
    }

    /// Snapshot for persistence under the request URL.
    pub fn to_stored(&self, request_url: &Url) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        StoredResponse::get(request_url.as_str(), self.status.as_u16(), headers, self.body.to_vec())
    }

    /// Rebuild a response from a persisted snapshot.
    ///
    /// Headers that no longer parse are dropped rather than failing the hit.
    pub fn from_stored(stored: StoredResponse) -> Option<Self> {
        let url = Url::parse(&stored.url).ok()?;
        let status = StatusCode::from_u16(stored.status).ok()?;
        let mut headers = HeaderMap::new();
        for (name, value) in &stored.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }
        Some(Self {
            url,
            status,
            response_type: ResponseType::Basic,
            headers,
            body: Bytes::from(stored.body),
            source: ResponseSource::Cache,
        })
    }
}
