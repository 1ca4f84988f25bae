//! Lifecycle event hooks

use crate::error::Error;
use crate::execution::Order;
use crate::signal::Signal;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strategy lifecycle state as reported to hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyState {
    #[default]
    Unknown,
    Running,
    Stopped,
    Error,
}

impl StrategyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyState::Unknown => "unknown",
            StrategyState::Running => "running",
            StrategyState::Stopped => "stopped",
            StrategyState::Error => "error",
        }
    }
}

impl fmt::Display for StrategyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consumer of executor lifecycle events
///
/// Hooks for one event run one after another on the dispatcher task.
/// A panicking hook is logged and the next hook still runs.
#[async_trait]
pub trait EventHook: Send + Sync {
    async fn on_signal_received(&self, signal: &Signal);

    async fn on_order_placed(&self, order: &Order);

    async fn on_status_update(
        &self,
        strategy_id: &str,
        state: StrategyState,
        error: Option<&Error>,
    );
}
