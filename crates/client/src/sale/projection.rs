//! Purchase projection: how many tokens an amount buys.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenProjection {
    pub base_tokens: u64,
    pub bonus_tokens: u64,
    /// `base_tokens + bonus_tokens`. Each part is floored on its own, so this
    /// can be one less than the floor of the unrounded sum.
    pub total_tokens: u64,
    pub usd_value: f64,
}

/// Project the tokens bought with `amount` of the quote currency.
///
/// `quote_price` is USD per unit paid, `reference_price` USD per token and
/// `bonus_rate` a percentage. Negative or NaN results floor to zero.
pub fn project(amount: f64, bonus_rate: f64, quote_price: f64, reference_price: f64) -> TokenProjection {
    let usd_value = amount * quote_price;
    let base = usd_value / reference_price;
    let bonus = base * (bonus_rate / 100.0);

    let base_tokens = base.floor() as u64;
    let bonus_tokens = bonus.floor() as u64;

    TokenProjection { base_tokens, bonus_tokens, total_tokens: base_tokens.saturating_add(bonus_tokens), usd_value }
}
