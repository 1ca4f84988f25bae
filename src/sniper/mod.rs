//! Sniper module
//!
//! Bounded-latency buys of freshly tradable coins. The controller listens
//! on the coin event bus and drives a [`SniperService`]; the shot use case
//! serves one-off user requests with balance pre-checks and price triggers.

mod controller;
mod service;
mod shot;
mod types;

pub use controller::{SniperController, AUTO_SNIPE_TIMEOUT};
pub use service::{ExchangeSniperService, SniperService, SNIPER_STRATEGY_ID};
pub use shot::{SniperShotUseCase, TRIGGER_POLL_INTERVAL};
pub use types::{
    Comparison, SnipeRequest, SnipeResult, SniperConfig, SniperStatus, TriggerCondition,
    DEFAULT_TIME_LIMIT,
};
