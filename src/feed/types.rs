//! Tick types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single market observation for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Trading symbol (e.g., "BTCUSDT")
    pub symbol: String,
    /// Observation time
    pub timestamp: DateTime<Utc>,
    /// Observation payload
    pub data: TickData,
}

/// Tick payload variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TickData {
    /// Exchange kline
    Kline {
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    },
    /// Aggregated candle with its time bounds
    Candle {
        open_time: DateTime<Utc>,
        close_time: DateTime<Utc>,
        open_price: Decimal,
        high_price: Decimal,
        low_price: Decimal,
        close_price: Decimal,
        volume: Decimal,
    },
    /// 24h ticker snapshot
    Ticker { price: Decimal, volume: Decimal },
    /// Single trade
    Trade { price: Decimal, quantity: Decimal },
}

impl Tick {
    /// Create a new tick
    pub fn new(symbol: impl Into<String>, timestamp: DateTime<Utc>, data: TickData) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            data,
        }
    }
}

impl TickData {
    /// Price carried by this observation (close for bars)
    pub fn price(&self) -> Decimal {
        match self {
            TickData::Kline { close, .. } => *close,
            TickData::Candle { close_price, .. } => *close_price,
            TickData::Ticker { price, .. } => *price,
            TickData::Trade { price, .. } => *price,
        }
    }

    /// Volume carried by this observation (trade quantity for trades)
    pub fn volume(&self) -> Decimal {
        match self {
            TickData::Kline { volume, .. } => *volume,
            TickData::Candle { volume, .. } => *volume,
            TickData::Ticker { volume, .. } => *volume,
            TickData::Trade { quantity, .. } => *quantity,
        }
    }

    /// Ticker shorthand
    pub fn ticker(price: Decimal, volume: Decimal) -> Self {
        TickData::Ticker { price, volume }
    }
}
