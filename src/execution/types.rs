//! Execution types

use crate::error::{Error, Result};
use crate::signal::{Payload, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Market order (immediate execution, price 0)
    Market,
    /// Limit order (price specified)
    Limit,
}

/// Time in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Good till canceled
    #[default]
    Gtc,
    /// Immediate or cancel
    Ioc,
    /// Fill or kill
    Fok,
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

impl OrderStatus {
    /// Terminal states never revert
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Canceled
                | OrderStatus::Rejected
                | OrderStatus::Expired
        )
    }

    /// Position in the canonical progression NEW < PARTIALLY_FILLED < terminal
    pub fn severity(&self) -> u8 {
        match self {
            OrderStatus::New => 0,
            OrderStatus::PartiallyFilled => 1,
            _ => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Canceled => "CANCELED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order to be submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Local order identifier
    pub id: Uuid,
    /// Strategy that produced the order (empty for manual orders)
    pub strategy_id: String,
    /// Client-assigned id, if any
    pub client_id: Option<String>,
    /// Exchange-assigned id, set once submitted
    pub exchange_id: Option<String>,
    /// Trading symbol
    pub symbol: String,
    /// Trade side
    pub side: Side,
    /// Order type
    pub order_type: OrderType,
    /// Order quantity in base asset
    pub quantity: Decimal,
    /// Limit price; 0 for market orders
    pub price: Decimal,
    /// Time in force
    pub time_in_force: TimeInForce,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Executed quantity
    pub executed_qty: Decimal,
    /// Average fill price
    pub avg_fill_price: Decimal,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
    /// Extra data carried over from the signal
    pub meta: Payload,
}

impl Order {
    fn build(
        symbol: impl Into<String>,
        side: Side,
        order_type: OrderType,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            strategy_id: String::new(),
            client_id: None,
            exchange_id: None,
            symbol: symbol.into(),
            side,
            order_type,
            quantity,
            price,
            time_in_force: TimeInForce::default(),
            status: OrderStatus::New,
            executed_qty: Decimal::ZERO,
            avg_fill_price: Decimal::ZERO,
            created_at: now,
            updated_at: now,
            meta: Payload::new(),
        }
    }

    /// Create a market order
    pub fn market(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        Self::build(symbol, side, OrderType::Market, quantity, Decimal::ZERO)
    }

    /// Create a limit order
    pub fn limit(symbol: impl Into<String>, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Self::build(symbol, side, OrderType::Limit, quantity, price)
    }

    /// Set the owning strategy id
    pub fn with_strategy(mut self, strategy_id: impl Into<String>) -> Self {
        self.strategy_id = strategy_id.into();
        self
    }

    /// Check the structural invariants of a submittable order
    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            return Err(Error::InvalidArg("order symbol is empty".into()));
        }
        if self.side == Side::Hold {
            return Err(Error::InvalidArg("HOLD cannot be placed as an order".into()));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(Error::InvalidArg(format!(
                "order quantity must be positive, got {}",
                self.quantity
            )));
        }
        if self.price < Decimal::ZERO {
            return Err(Error::InvalidArg(format!(
                "order price must not be negative, got {}",
                self.price
            )));
        }
        match (self.order_type, self.price.is_zero()) {
            (OrderType::Market, false) => Err(Error::InvalidArg(
                "market orders must not carry a price".into(),
            )),
            (OrderType::Limit, true) => {
                Err(Error::InvalidArg("limit orders require a price".into()))
            }
            _ => Ok(()),
        }
    }

    /// Quote value of the order at the given reference price
    pub fn notional(&self, reference_price: Decimal) -> Decimal {
        let price = if self.price.is_zero() {
            reference_price
        } else {
            self.price
        };
        self.quantity * price
    }
}

/// Latest ticker snapshot for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    /// Last traded price
    pub price: Decimal,
    /// Absolute price change over the ticker window
    pub price_change: Decimal,
    /// Traded volume over the ticker window
    pub volume: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Ticker {
    pub fn new(symbol: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            price_change: Decimal::ZERO,
            volume: Decimal::ZERO,
            timestamp: Utc::now(),
        }
    }
}

/// Exchange trading rules for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    /// Exchange status string, e.g. "TRADING"
    pub status: String,
    pub min_qty: Decimal,
    pub min_notional: Decimal,
}

impl SymbolInfo {
    pub fn is_trading(&self) -> bool {
        self.status == "TRADING"
    }
}

/// Historical bar returned by the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// A price level in an order book
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// Order book snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: String,
    /// Best bid first
    pub bids: Vec<PriceLevel>,
    /// Best ask first
    pub asks: Vec<PriceLevel>,
    pub timestamp: DateTime<Utc>,
}
