//! Wallet types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Quote assets recognised when splitting a symbol, checked in order
const QUOTE_ASSETS: [&str; 6] = ["USDT", "BTC", "ETH", "BNB", "BUSD", "USDC"];

/// Balance of a single asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    /// Available for trading
    pub free: Decimal,
    /// Reserved by open orders
    pub locked: Decimal,
}

/// A user's balances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: String,
    pub balances: HashMap<String, Balance>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create an empty wallet
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            balances: HashMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Set the free balance of an asset
    pub fn with_balance(mut self, asset: &str, free: Decimal) -> Self {
        self.set_free(asset, free);
        self
    }

    /// Free balance of an asset, zero when absent
    pub fn free(&self, asset: &str) -> Decimal {
        self.balances
            .get(asset)
            .map(|b| b.free)
            .unwrap_or(Decimal::ZERO)
    }

    /// Overwrite the free balance of an asset
    pub fn set_free(&mut self, asset: &str, free: Decimal) {
        let entry = self
            .balances
            .entry(asset.to_string())
            .or_insert_with(|| Balance {
                asset: asset.to_string(),
                free: Decimal::ZERO,
                locked: Decimal::ZERO,
            });
        entry.free = free;
        self.updated_at = Utc::now();
    }

    /// Add (or with a negative delta, subtract) from a free balance
    pub fn adjust_free(&mut self, asset: &str, delta: Decimal) {
        let current = self.free(asset);
        self.set_free(asset, current + delta);
    }
}

/// Point-in-time balance record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceHistoryEntry {
    pub user_id: String,
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Split a symbol into (base, quote)
///
/// Known quote assets are matched as suffixes. Unknown symbols of six or
/// more characters split after the fourth-from-last character; three to five
/// characters split 3/rest; anything shorter yields two empty strings.
pub fn parse_symbol_assets(symbol: &str) -> (String, String) {
    for quote in QUOTE_ASSETS {
        if let Some(base) = symbol.strip_suffix(quote) {
            if !base.is_empty() {
                return (base.to_string(), quote.to_string());
            }
        }
    }

    if !symbol.is_ascii() {
        return (String::new(), String::new());
    }
    let len = symbol.len();
    if len >= 6 {
        (symbol[..len - 4].to_string(), symbol[len - 4..].to_string())
    } else if len >= 3 {
        (symbol[..3].to_string(), symbol[3..].to_string())
    } else {
        (String::new(), String::new())
    }
}
