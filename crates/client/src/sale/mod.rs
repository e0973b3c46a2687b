//! Presale data service.
//!
//! Wraps the presale contract, a price source and the lot catalog behind
//! read-through caches. Reads never fail: when the contract or price source
//! cannot be reached the service serves defaults. Purchases are never cached
//! and their failures propagate unchanged.

pub mod catalog;
pub mod price;
pub mod projection;
pub mod provider;
pub mod snapshot;
pub mod store;

pub use catalog::{CatalogProvider, Dynasty, Lot, LotStatus, StaticCatalog};
pub use price::{CoinGeckoPrice, PriceError, PriceSource};
pub use projection::{TokenProjection, project};
pub use provider::{ProviderError, SaleProvider, StageInfo};
pub use snapshot::{SaleReads, SaleSnapshot, SnapshotSource};
pub use store::{CachedValue, ReadThroughStore};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use shenbury_core::{AppConfig, Error};

const SALE_KEY: &str = "sale";
const PRICE_KEY: &str = "price";

/// Quote-currency amounts are sent in 6-decimal units.
const SUN_PER_UNIT: f64 = 1e6;

/// Settings for [`SaleDataService`].
#[derive(Debug, Clone)]
pub struct SaleConfig {
    /// Freshness window for cached reads (default: 10s)
    pub ttl: Duration,
    /// How long `initialize` waits for the provider (default: 5s)
    pub ready_timeout: Duration,
    /// USD per token used for projections.
    pub reference_price: f64,
    /// USD per quote unit when no price has been fetched.
    pub fallback_price: f64,
}

impl Default for SaleConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SaleConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            ttl: config.value_ttl(),
            ready_timeout: config.provider_ready_timeout(),
            reference_price: config.reference_price,
            fallback_price: config.fallback_price,
        }
    }
}

/// A submitted purchase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub tx_id: String,
    pub amount: f64,
}

pub struct SaleDataService {
    config: SaleConfig,
    provider: Arc<dyn SaleProvider>,
    prices: Arc<dyn PriceSource>,
    catalog: Arc<dyn CatalogProvider>,
    snapshots: ReadThroughStore<SaleSnapshot>,
    quotes: ReadThroughStore<f64>,
    connected: AtomicBool,
}

impl SaleDataService {
    pub fn new(
        config: SaleConfig, provider: Arc<dyn SaleProvider>, prices: Arc<dyn PriceSource>,
        catalog: Arc<dyn CatalogProvider>,
    ) -> Self {
        Self {
            snapshots: ReadThroughStore::new(config.ttl),
            quotes: ReadThroughStore::new(config.ttl),
            config,
            provider,
            prices,
            catalog,
            connected: AtomicBool::new(false),
        }
    }

    /// Wait, bounded by the configured timeout, for the provider handshake.
    ///
    /// Returns whether the provider is connected. On timeout the service keeps
    /// running and serves defaults.
    pub async fn initialize(&self) -> bool {
        let ready = self.provider.ready(self.config.ready_timeout).await;
        self.connected.store(ready, Ordering::SeqCst);

        if ready {
            tracing::info!("sale provider connected");
        } else {
            tracing::warn!(
                timeout_ms = self.config.ready_timeout.as_millis() as u64,
                "sale provider not ready; serving defaults"
            );
        }
        ready
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.provider.is_ready()
    }

    /// Current sale state, at most one TTL old, or the default snapshot.
    pub async fn sale_data(&self) -> Arc<SaleSnapshot> {
        self.snapshots.get(SALE_KEY, self.read_live(), || SaleSnapshot::fallback(Utc::now())).await
    }

    async fn read_live(&self) -> Result<SaleSnapshot, ProviderError> {
        if !self.is_connected() {
            return Err(ProviderError::NotReady);
        }

        let provider = &self.provider;
        let (current_stage, total_sold, presale_active, start_time, end_time, stage) = tokio::try_join!(
            provider.current_stage(),
            provider.total_sold(),
            provider.presale_active(),
            provider.start_time(),
            provider.end_time(),
            provider.stage_info(),
        )?;

        SaleReads { current_stage, total_sold, presale_active, start_time, end_time, stage }.into_snapshot()
    }

    /// USD price of the quote currency, at most one TTL old, or the fallback price.
    pub async fn token_price(&self) -> f64 {
        *self.quotes.get(PRICE_KEY, self.prices.usd_price(), || self.config.fallback_price).await
    }

    /// Project a purchase using the last fetched price, however old, or the
    /// fallback price.
    pub fn project(&self, amount: f64, bonus_rate: f64) -> TokenProjection {
        let quote_price = self.quotes.entry(PRICE_KEY).map_or(self.config.fallback_price, |entry| *entry.value);
        project(amount, bonus_rate, quote_price, self.config.reference_price)
    }

    /// Submit a purchase of `amount` quote units.
    ///
    /// Never cached. Every failure is returned to the caller.
    pub async fn purchase(&self, amount: f64) -> Result<Purchase, Error> {
        if !self.is_connected() {
            return Err(Error::ProviderUnavailable("presale contract not loaded".into()));
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::InvalidInput(format!("purchase amount must be positive, got {amount}")));
        }

        let units = (amount * SUN_PER_UNIT).round();
        if units < 1.0 || units >= u64::MAX as f64 {
            return Err(Error::InvalidInput(format!("purchase amount {amount} is outside the transferable range")));
        }

        let amount_sun = units as u64;
        let tx_id = self.provider.submit_transfer(amount_sun).await.map_err(|e| {
            tracing::error!(amount, error = %e, "purchase failed");
            Error::TransferFailed(e.to_string())
        })?;

        self.snapshots.invalidate(SALE_KEY);
        tracing::info!(amount, tx_id = %tx_id, "purchase submitted");
        Ok(Purchase { tx_id, amount })
    }

    /// Token balance of `address`. Zero when disconnected or on failure.
    pub async fn balance_of(&self, address: &str) -> f64 {
        if !self.is_connected() || address.trim().is_empty() {
            return 0.0;
        }

        match self.provider.balance_of(address).await {
            Ok(raw) => snapshot::token_amount(raw),
            Err(e) => {
                tracing::warn!(address, error = %e, "balance lookup failed");
                0.0
            }
        }
    }

    /// Auction lots in display order.
    pub async fn lots(&self) -> Vec<Lot> {
        self.catalog.lots().await
    }
}
