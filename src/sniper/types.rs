//! Sniper types

use crate::error::{Error, Result};
use crate::execution::{Order, OrderType};
use crate::signal::Side;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default snipe time limit
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(30);

/// Price comparison for trigger conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Comparison {
    Above,
    Below,
}

/// Price level that must be reached before firing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerCondition {
    pub threshold: Decimal,
    pub comparison: Comparison,
    /// Maximum accepted slippage in percent
    #[serde(default)]
    pub max_slippage: Decimal,
}

impl TriggerCondition {
    pub fn is_met(&self, price: Decimal) -> bool {
        match self.comparison {
            Comparison::Above => price >= self.threshold,
            Comparison::Below => price <= self.threshold,
        }
    }
}

/// Sniper settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SniperConfig {
    /// Quote amount spent per snipe
    #[serde(default = "default_max_buy_amount")]
    pub max_buy_amount: Decimal,
    #[serde(default = "default_max_price_per_token")]
    pub max_price_per_token: Decimal,
    /// Fill price deviation, in percent, above which a fill is reported
    #[serde(default = "default_slippage_percent")]
    pub slippage_percent: Decimal,
    #[serde(default = "default_max_concurrent_orders")]
    pub max_concurrent_orders: usize,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub enable_take_profit: bool,
    #[serde(default = "default_take_profit_percent")]
    pub take_profit_percent: Decimal,
    /// Snipe automatically when a coin becomes tradable
    #[serde(default)]
    pub auto_snipe: bool,
    #[serde(default = "default_snipe_timeout_secs")]
    pub snipe_timeout_secs: u64,
    #[serde(default)]
    pub trigger: Option<TriggerCondition>,
}

fn default_max_buy_amount() -> Decimal {
    dec!(100)
}
fn default_max_price_per_token() -> Decimal {
    dec!(1)
}
fn default_slippage_percent() -> Decimal {
    dec!(5)
}
fn default_max_concurrent_orders() -> usize {
    3
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    100
}
fn default_take_profit_percent() -> Decimal {
    dec!(20)
}
fn default_snipe_timeout_secs() -> u64 {
    30
}

impl Default for SniperConfig {
    fn default() -> Self {
        Self {
            max_buy_amount: default_max_buy_amount(),
            max_price_per_token: default_max_price_per_token(),
            slippage_percent: default_slippage_percent(),
            max_concurrent_orders: default_max_concurrent_orders(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            enable_take_profit: false,
            take_profit_percent: default_take_profit_percent(),
            auto_snipe: false,
            snipe_timeout_secs: default_snipe_timeout_secs(),
            trigger: None,
        }
    }
}

impl SniperConfig {
    /// Time limit for a single snipe
    pub fn time_limit(&self) -> Duration {
        if self.snipe_timeout_secs == 0 {
            DEFAULT_TIME_LIMIT
        } else {
            Duration::from_secs(self.snipe_timeout_secs)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_buy_amount <= Decimal::ZERO {
            return Err(Error::InvalidArg("max_buy_amount must be positive".into()));
        }
        if self.max_price_per_token <= Decimal::ZERO {
            return Err(Error::InvalidArg("max_price_per_token must be positive".into()));
        }
        if self.max_concurrent_orders == 0 {
            return Err(Error::InvalidArg("max_concurrent_orders must be at least 1".into()));
        }
        if self.enable_take_profit && self.take_profit_percent <= Decimal::ZERO {
            return Err(Error::InvalidArg("take_profit_percent must be positive".into()));
        }
        Ok(())
    }
}

/// Running state of a sniper service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SniperStatus {
    Stopped,
    Running,
}

impl fmt::Display for SniperStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SniperStatus::Stopped => f.write_str("stopped"),
            SniperStatus::Running => f.write_str("running"),
        }
    }
}

/// A user-initiated sniper shot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnipeRequest {
    pub user_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    /// Limit price; 0 for market orders
    #[serde(default)]
    pub price: Decimal,
    pub order_type: OrderType,
    /// Zero means [`DEFAULT_TIME_LIMIT`]
    #[serde(default)]
    pub time_limit: Duration,
    /// Zero disables the trigger
    #[serde(default)]
    pub price_threshold: Decimal,
    #[serde(default)]
    pub comparison: Option<Comparison>,
    #[serde(default)]
    pub max_slippage: Decimal,
}

impl SnipeRequest {
    pub fn market(
        user_id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        quantity: Decimal,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            symbol: symbol.into(),
            side,
            quantity,
            price: Decimal::ZERO,
            order_type: OrderType::Market,
            time_limit: Duration::ZERO,
            price_threshold: Decimal::ZERO,
            comparison: None,
            max_slippage: Decimal::ZERO,
        }
    }

    pub fn limit(
        user_id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            price,
            order_type: OrderType::Limit,
            ..Self::market(user_id, symbol, side, quantity)
        }
    }

    /// Fire only once the price crosses `threshold`
    pub fn with_trigger(mut self, threshold: Decimal, comparison: Comparison) -> Self {
        self.price_threshold = threshold;
        self.comparison = Some(comparison);
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Check the request and fill in a default time limit
    pub fn validate(&mut self) -> Result<()> {
        if self.user_id.is_empty() {
            return Err(Error::InvalidArg("missing user id".into()));
        }
        if self.symbol.is_empty() {
            return Err(Error::InvalidArg("missing trading symbol".into()));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(Error::InvalidArg("quantity must be greater than zero".into()));
        }
        if self.order_type == OrderType::Limit && self.price <= Decimal::ZERO {
            return Err(Error::InvalidArg("price must be specified for limit orders".into()));
        }
        if self.side == Side::Hold {
            return Err(Error::InvalidArg("invalid order side".into()));
        }
        if self.price_threshold > Decimal::ZERO && self.comparison.is_none() {
            return Err(Error::InvalidArg("invalid comparison type for price threshold".into()));
        }
        if self.time_limit.is_zero() {
            self.time_limit = DEFAULT_TIME_LIMIT;
        }
        Ok(())
    }

    /// Trigger condition, if a threshold is set
    pub fn trigger(&self) -> Option<TriggerCondition> {
        match (self.price_threshold > Decimal::ZERO, self.comparison) {
            (true, Some(comparison)) => Some(TriggerCondition {
                threshold: self.price_threshold,
                comparison,
                max_slippage: self.max_slippage,
            }),
            _ => None,
        }
    }

    pub(crate) fn to_order(&self) -> Order {
        match self.order_type {
            OrderType::Market => Order::market(&self.symbol, self.side, self.quantity),
            OrderType::Limit => Order::limit(&self.symbol, self.side, self.quantity, self.price),
        }
    }
}

/// Outcome of a sniper shot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnipeResult {
    pub success: bool,
    pub order: Option<Order>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub latency: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_request_validation() {
        let mut ok = SnipeRequest::market("u1", "XYZUSDT", Side::Buy, dec!(10));
        ok.validate().unwrap();
        assert_eq!(ok.time_limit, DEFAULT_TIME_LIMIT);

        let cases = [
            SnipeRequest::market("", "XYZUSDT", Side::Buy, dec!(1)),
            SnipeRequest::market("u1", "", Side::Buy, dec!(1)),
            SnipeRequest::market("u1", "XYZUSDT", Side::Buy, dec!(0)),
            SnipeRequest::market("u1", "XYZUSDT", Side::Hold, dec!(1)),
            SnipeRequest::limit("u1", "XYZUSDT", Side::Buy, dec!(1), dec!(0)),
            SnipeRequest {
                price_threshold: dec!(5),
                ..SnipeRequest::market("u1", "XYZUSDT", Side::Buy, dec!(1))
            },
        ];
        for mut bad in cases {
            assert_eq!(bad.validate().unwrap_err().kind(), ErrorKind::InvalidArg);
        }
    }

    #[test]
    fn test_trigger_condition() {
        let req = SnipeRequest::market("u1", "XYZUSDT", Side::Buy, dec!(1))
            .with_trigger(dec!(2), Comparison::Below);
        let trigger = req.trigger().unwrap();
        assert!(trigger.is_met(dec!(1.5)));
        assert!(trigger.is_met(dec!(2)));
        assert!(!trigger.is_met(dec!(2.1)));

        let plain = SnipeRequest::market("u1", "XYZUSDT", Side::Buy, dec!(1));
        assert!(plain.trigger().is_none());
    }

    #[test]
    fn test_config_defaults() {
        let config: SniperConfig = toml::from_str("max_buy_amount = 50").unwrap();
        assert_eq!(config.max_buy_amount, dec!(50));
        assert_eq!(config.max_concurrent_orders, 3);
        assert_eq!(config.time_limit(), Duration::from_secs(30));
        assert!(!config.enable_take_profit);
        config.validate().unwrap();

        let bad = SniperConfig {
            max_concurrent_orders: 0,
            ..SniperConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
