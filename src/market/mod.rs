//! Market module
//!
//! New-coin detection: polls exchange listings, persists what it finds and
//! publishes lifecycle events on an [`EventBus`].

mod bus;
mod detector;
mod repository;
mod types;

pub use bus::{CoinEventHandler, EventBus};
pub use detector::{DetectorConfig, NewCoinDetector};
pub use repository::{CoinRepository, InMemoryCoinRepository};
pub use types::{CoinEvent, CoinEventKind, CoinStatus, Listing, NewCoin};
