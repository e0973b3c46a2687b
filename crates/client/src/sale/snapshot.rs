//! Sale state as shown to buyers.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::provider::{ProviderError, StageInfo};

const TOKEN_DECIMALS: f64 = 1e18;
const PRICE_DECIMALS: f64 = 1e6;

/// How long the default sale window runs from "now".
const DEFAULT_WINDOW_DAYS: i64 = 14;
const DEFAULT_PRICE: f64 = 0.10;
const DEFAULT_AVAILABLE: f64 = 10_000_000.0;
const DEFAULT_BONUS: u32 = 30;

/// Whether a snapshot came from the contract or is the built-in default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    Live,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleSnapshot {
    pub current_stage: u32,
    pub total_sold: f64,
    /// Not tracked on-chain; always 0.
    pub total_raised: f64,
    /// Not tracked on-chain; always 0.
    pub participants: u64,
    pub presale_active: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// USD per token.
    pub current_price: f64,
    pub available_tokens: f64,
    /// Percent.
    pub stage_bonus: u32,
    pub source: SnapshotSource,
}

impl SaleSnapshot {
    /// The default shown when the contract cannot be read.
    pub fn fallback(now: DateTime<Utc>) -> Self {
        Self {
            current_stage: 0,
            total_sold: 0.0,
            total_raised: 0.0,
            participants: 0,
            presale_active: false,
            start_time: now,
            end_time: now + Duration::days(DEFAULT_WINDOW_DAYS),
            current_price: DEFAULT_PRICE,
            available_tokens: DEFAULT_AVAILABLE,
            stage_bonus: DEFAULT_BONUS,
            source: SnapshotSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == SnapshotSource::Fallback
    }
}

/// Results of the independent contract reads, still in on-chain units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleReads {
    pub current_stage: u32,
    pub total_sold: u128,
    pub presale_active: bool,
    pub start_time: i64,
    pub end_time: i64,
    pub stage: StageInfo,
}

impl SaleReads {
    pub fn into_snapshot(self) -> Result<SaleSnapshot, ProviderError> {
        Ok(SaleSnapshot {
            current_stage: self.current_stage,
            total_sold: self.total_sold as f64 / TOKEN_DECIMALS,
            total_raised: 0.0,
            participants: 0,
            presale_active: self.presale_active,
            start_time: timestamp("startTime", self.start_time)?,
            end_time: timestamp("endTime", self.end_time)?,
            current_price: self.stage.price as f64 / PRICE_DECIMALS,
            available_tokens: self.stage.available as f64 / TOKEN_DECIMALS,
            stage_bonus: self.stage.bonus,
            source: SnapshotSource::Live,
        })
    }
}

/// Convert an 18-decimal token amount to whole tokens.
pub fn token_amount(raw: u128) -> f64 {
    raw as f64 / TOKEN_DECIMALS
}

fn timestamp(call: &'static str, secs: i64) -> Result<DateTime<Utc>, ProviderError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| ProviderError::Call { call, reason: format!("timestamp {secs} out of range") })
}
