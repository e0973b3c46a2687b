//! Quote-currency price lookup.
//!
//! The default source is the CoinGecko simple price endpoint:
//! `GET /api/v3/simple/price?ids=tron&vs_currencies=usd` returning
//! `{"tron":{"usd":0.1234}}`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use shenbury_core::AppConfig;

/// Errors from a price lookup.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PriceError {
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    #[error("request timeout")]
    Timeout,

    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for PriceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { PriceError::Timeout } else { PriceError::Network(Arc::new(err)) }
    }
}

/// USD price of the currency buyers pay with.
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    async fn usd_price(&self) -> Result<f64, PriceError>;
}

#[derive(Debug, Deserialize)]
struct UsdQuote {
    usd: f64,
}

/// CoinGecko-backed [`PriceSource`].
#[derive(Debug, Clone)]
pub struct CoinGeckoPrice {
    http: reqwest::Client,
    url: String,
}

impl CoinGeckoPrice {
    pub fn new(url: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self, PriceError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| PriceError::Network(Arc::new(e)))?;

        Ok(Self { http, url: url.into() })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, PriceError> {
        Self::new(config.price_url.clone(), &config.user_agent, config.timeout())
    }
}

#[async_trait::async_trait]
impl PriceSource for CoinGeckoPrice {
    async fn usd_price(&self) -> Result<f64, PriceError> {
        let start = Instant::now();
        let response = self.http.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriceError::HttpError { status: status.as_u16() });
        }

        let body = response.text().await?;
        let price = parse_price(&body)?;

        tracing::debug!(price, elapsed_ms = start.elapsed().as_millis() as u64, "price lookup complete");
        Ok(price)
    }
}

/// Extract the single USD quote from a simple-price response body.
fn parse_price(body: &str) -> Result<f64, PriceError> {
    let quotes: HashMap<String, UsdQuote> =
        serde_json::from_str(body).map_err(|e| PriceError::Parse(e.to_string()))?;

    let price = quotes
        .into_values()
        .next()
        .map(|quote| quote.usd)
        .ok_or_else(|| PriceError::Parse("no quote in response".into()))?;

    if !price.is_finite() || price <= 0.0 {
        return Err(PriceError::Parse(format!("implausible price {price}")));
    }
    Ok(price)
}
