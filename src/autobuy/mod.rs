//! AutoBuy module
//!
//! Standing buy rules evaluated against live tickers. A rule fires when its
//! trigger holds, it is out of cooldown and the user can fund it.

mod repository;
mod service;
mod types;

pub use repository::{AutoBuyRepository, InMemoryAutoBuyRepository};
pub use service::{AutoBuyConfig, AutoBuyService, AUTOBUY_STRATEGY_ID};
pub use types::{AutoBuyExecution, AutoBuyRule, TriggerType};
