//! Remote presale contract boundary.

use std::time::Duration;

/// Readiness poll interval used by [`SaleProvider::ready`].
const READY_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Wallet or contract connection not established.
    #[error("provider not ready")]
    NotReady,

    #[error("contract call {call} failed: {reason}")]
    Call { call: &'static str, reason: String },

    /// The chain refused a transfer.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Raw stage parameters as returned by the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageInfo {
    /// Price per token in 6-decimal fixed point.
    pub price: u128,
    /// Tokens left in this stage, 18 decimals.
    pub available: u128,
    /// Bonus percentage.
    pub bonus: u32,
}

/// A presale contract reachable through a wallet connection.
///
/// Every read is independent so callers can issue them concurrently.
#[async_trait::async_trait]
pub trait SaleProvider: Send + Sync {
    /// Whether the connection handshake has completed.
    fn is_ready(&self) -> bool;

    /// Wait up to `timeout` for readiness. Returns the final readiness.
    async fn ready(&self, timeout: Duration) -> bool {
        let wait = async {
            let mut tick = tokio::time::interval(READY_POLL);
            loop {
                tick.tick().await;
                if self.is_ready() {
                    return;
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    async fn current_stage(&self) -> Result<u32, ProviderError>;

    /// Tokens sold so far, 18 decimals.
    async fn total_sold(&self) -> Result<u128, ProviderError>;

    async fn presale_active(&self) -> Result<bool, ProviderError>;

    /// Unix seconds.
    async fn start_time(&self) -> Result<i64, ProviderError>;

    /// Unix seconds.
    async fn end_time(&self) -> Result<i64, ProviderError>;

    async fn stage_info(&self) -> Result<StageInfo, ProviderError>;

    /// Send `amount_sun` to the presale contract. Returns the transaction id.
    async fn submit_transfer(&self, amount_sun: u64) -> Result<String, ProviderError>;

    /// Token balance of `address`, 18 decimals.
    async fn balance_of(&self, address: &str) -> Result<u128, ProviderError>;
}
