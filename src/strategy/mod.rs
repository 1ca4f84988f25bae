//! Strategy module
//!
//! Strategies turn ticks into signals. Each built-in strategy composes a
//! [`History`] for per-symbol bookkeeping and carries its own typed
//! parameters. The [`StrategyRegistry`] builds instances by factory name.

mod breakout;
mod crossover;
mod exits;
mod history;
mod new_coin;
mod params;
mod registry;
mod volume_spike;

pub use breakout::BreakoutStrategy;
pub use crossover::DefaultStrategy;
pub use history::{History, Indicator, DEFAULT_MAX_HISTORY};
pub use new_coin::NewCoinStrategy;
pub use params::{BreakoutParams, CrossoverParams, NewCoinParams, StrategyConfig, VolumeSpikeParams};
pub use registry::{factory, StrategyFactory, StrategyRegistry};
pub use volume_spike::VolumeSpikeStrategy;

use crate::error::Result;
use crate::execution::Order;
use crate::feed::TickData;
use crate::signal::Signal;
use chrono::{DateTime, Utc};

/// Stateful tick to signal transformer
///
/// Calls on one instance are serialized by the owner; implementations need
/// not support concurrent `on_tick` calls.
pub trait Strategy: Send + Sync {
    /// Display name
    fn name(&self) -> &str;

    /// Apply parameters and reset all per-symbol state
    fn initialize(&mut self, config: &StrategyConfig) -> Result<()>;

    /// Current parameters
    fn params(&self) -> StrategyConfig;

    /// Replace parameters, keeping history
    fn update_params(&mut self, config: &StrategyConfig) -> Result<()>;

    /// Process one tick and return any signals
    fn on_tick(
        &mut self,
        symbol: &str,
        timestamp: DateTime<Utc>,
        data: &TickData,
    ) -> Result<Vec<Signal>>;

    /// Update position state from a fill
    fn on_order_filled(&mut self, order: &Order) -> Result<()>;

    /// SELL signals for every open position
    fn close_positions(&mut self) -> Result<Vec<Signal>>;

    /// Whether a position is open for `symbol`
    fn has_position(&self, symbol: &str) -> bool;

    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}
