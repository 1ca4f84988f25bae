//! Signal types

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Free-form key/value data attached to signals and orders
pub type Payload = serde_json::Map<String, Value>;

/// Trading side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
    Hold,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
            Side::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            "HOLD" => Ok(Side::Hold),
            other => Err(Error::InvalidArg(format!("unknown side: {}", other))),
        }
    }
}

/// A strategy's intent to trade a symbol
///
/// A quantity or price of zero means "fill in downstream" (sizer or
/// current market price).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Unique signal identifier
    pub id: Uuid,
    /// Id of the strategy that produced the signal
    pub strategy_id: String,
    /// Trading symbol
    pub symbol: String,
    /// Trade direction
    pub side: Side,
    /// Requested quantity (0 = sized downstream)
    pub quantity: Decimal,
    /// Reference price (0 = current market price)
    pub price: Decimal,
    /// Signal timestamp (tick time, not wall clock)
    pub timestamp: DateTime<Utc>,
    /// Human-readable reason
    pub reason: String,
    /// Extra data; `symbol`, `quantity` and `price` mirror the fields above
    pub payload: Payload,
}

impl Signal {
    /// Create a signal for one unit at `price`
    pub fn new(
        symbol: impl Into<String>,
        side: Side,
        price: Decimal,
        timestamp: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        let mut signal = Self {
            id: Uuid::new_v4(),
            strategy_id: String::new(),
            symbol: symbol.into(),
            side,
            quantity: dec!(1),
            price,
            timestamp,
            reason: reason.into(),
            payload: Payload::new(),
        };
        signal.sync_payload();
        signal
    }

    /// Set the producing strategy id
    pub fn with_strategy(mut self, strategy_id: impl Into<String>) -> Self {
        self.strategy_id = strategy_id.into();
        self
    }

    /// Set the requested quantity
    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self.sync_payload();
        self
    }

    /// Set the reference price
    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = price;
        self.sync_payload();
        self
    }

    /// Attach an extra payload entry
    pub fn with_payload(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    fn sync_payload(&mut self) {
        self.payload
            .insert("symbol".into(), Value::String(self.symbol.clone()));
        self.payload
            .insert("quantity".into(), Value::String(self.quantity.to_string()));
        self.payload
            .insert("price".into(), Value::String(self.price.to_string()));
    }

    /// Read a decimal payload entry written either as a string or a number
    pub fn payload_decimal(&self, key: &str) -> Option<Decimal> {
        match self.payload.get(key)? {
            Value::String(s) => Decimal::from_str(s).ok(),
            Value::Number(n) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .ok(),
            _ => None,
        }
    }

    /// Read a string payload entry
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

/// Format a float percentage the way signal reasons print it
pub(crate) fn pct(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Convert a history value back to a decimal price
pub(crate) fn to_decimal(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or_default()
}
