//! New-coin listing types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Exchange trading status of a listed symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoinStatus {
    PreTrading,
    Trading,
    Break,
    Halt,
    Delisted,
}

impl CoinStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoinStatus::PreTrading => "PRE_TRADING",
            CoinStatus::Trading => "TRADING",
            CoinStatus::Break => "BREAK",
            CoinStatus::Halt => "HALT",
            CoinStatus::Delisted => "DELISTED",
        }
    }
}

impl fmt::Display for CoinStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A listing as reported by the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub status: CoinStatus,
}

impl Listing {
    pub fn new(symbol: impl Into<String>, status: CoinStatus) -> Self {
        let symbol = symbol.into();
        let (base_asset, quote_asset) = crate::wallet::parse_symbol_assets(&symbol);
        Self {
            symbol,
            base_asset,
            quote_asset,
            status,
        }
    }
}

/// A coin tracked by the detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCoin {
    /// Detector-assigned identifier
    pub id: Uuid,
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub status: CoinStatus,
    /// When the detector first saw the listing
    pub first_seen_at: DateTime<Utc>,
    /// First transition to TRADING, never overwritten
    pub became_tradable_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl NewCoin {
    /// Start tracking a listing
    pub fn from_listing(listing: &Listing, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: listing.symbol.clone(),
            base_asset: listing.base_asset.clone(),
            quote_asset: listing.quote_asset.clone(),
            status: listing.status,
            first_seen_at: now,
            became_tradable_at: (listing.status == CoinStatus::Trading).then_some(now),
            updated_at: now,
        }
    }
}

/// What happened to a coin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoinEventKind {
    NewCoinDetected,
    StatusChanged { old: CoinStatus, new: CoinStatus },
}

/// Event published on the coin event bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinEvent {
    pub kind: CoinEventKind,
    pub coin: NewCoin,
    pub timestamp: DateTime<Utc>,
}

impl CoinEvent {
    /// Wire name of the event
    pub fn event_type(&self) -> &'static str {
        match self.kind {
            CoinEventKind::NewCoinDetected => "new_coin_detected",
            CoinEventKind::StatusChanged { .. } => "status_changed",
        }
    }

    /// True for a status change into TRADING
    pub fn became_tradable(&self) -> bool {
        matches!(
            self.kind,
            CoinEventKind::StatusChanged {
                new: CoinStatus::Trading,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_assets() {
        let listing = Listing::new("XYZUSDT", CoinStatus::PreTrading);
        assert_eq!(listing.base_asset, "XYZ");
        assert_eq!(listing.quote_asset, "USDT");
    }

    #[test]
    fn test_new_coin_tradable_stamp() {
        let now = Utc::now();
        let pre = NewCoin::from_listing(&Listing::new("ABCUSDT", CoinStatus::PreTrading), now);
        assert!(pre.became_tradable_at.is_none());

        let live = NewCoin::from_listing(&Listing::new("ABCUSDT", CoinStatus::Trading), now);
        assert_eq!(live.became_tradable_at, Some(now));
    }

    #[test]
    fn test_event_type_names() {
        let coin = NewCoin::from_listing(&Listing::new("ABCUSDT", CoinStatus::Trading), Utc::now());
        let event = CoinEvent {
            kind: CoinEventKind::StatusChanged {
                old: CoinStatus::PreTrading,
                new: CoinStatus::Trading,
            },
            coin,
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type(), "status_changed");
        assert!(event.became_tradable());
    }
}
