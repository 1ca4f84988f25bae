//! Range breakout strategy

use super::exits::{Entries, ExitRules};
use super::history::{to_f64, History};
use super::params::{BreakoutParams, StrategyConfig};
use super::Strategy;
use crate::error::{Error, Result};
use crate::execution::Order;
use crate::feed::TickData;
use crate::signal::{pct, Side, Signal};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Support and resistance held while a breakout is being confirmed
#[derive(Debug, Clone, Copy, PartialEq)]
struct Pending {
    support: f64,
    resistance: f64,
    confirmations: u32,
}

/// Buys after price holds above the recent range for N consecutive ticks
///
/// The range is taken from the `range_period` closes before the current
/// tick. Once a tick closes above the breakout level the range is frozen
/// until the breakout is confirmed or price falls back below it.
pub struct BreakoutStrategy {
    params: BreakoutParams,
    history: History,
    entries: Entries,
    pending: HashMap<String, Pending>,
}

impl BreakoutStrategy {
    pub const NAME: &'static str = "Breakout";

    pub fn new() -> Self {
        Self::with_params(BreakoutParams::default())
    }

    pub fn with_params(params: BreakoutParams) -> Self {
        Self {
            params,
            history: History::default(),
            entries: Entries::default(),
            pending: HashMap::new(),
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Current confirmation count for a symbol
    pub fn confirmations(&self, symbol: &str) -> u32 {
        self.pending.get(symbol).map_or(0, |p| p.confirmations)
    }

    fn exit_rules(&self) -> ExitRules {
        ExitRules {
            take_profit_percent: self.params.take_profit_percent,
            stop_loss_percent: self.params.stop_loss_percent,
            max_bars: Some(self.params.exit_after_bars),
        }
    }

    /// Support and resistance from the closes preceding the current one
    fn range(&self, symbol: &str) -> Option<(f64, f64)> {
        if let Some(pending) = self.pending.get(symbol) {
            return Some((pending.support, pending.resistance));
        }
        let prices = self.history.prices(symbol)?;
        let period = self.params.range_period;
        if prices.len() <= period {
            return None;
        }
        let end = prices.len() - 1;
        let window = prices.range(end - period..end);
        let support = window.clone().copied().fold(f64::INFINITY, f64::min);
        let resistance = window.copied().fold(f64::NEG_INFINITY, f64::max);
        Some((support, resistance))
    }
}

impl Default for BreakoutStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for BreakoutStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn initialize(&mut self, config: &StrategyConfig) -> Result<()> {
        self.update_params(config)?;
        self.history.reset();
        self.entries.clear();
        self.pending.clear();
        Ok(())
    }

    fn params(&self) -> StrategyConfig {
        StrategyConfig::Breakout(self.params.clone())
    }

    fn update_params(&mut self, config: &StrategyConfig) -> Result<()> {
        let StrategyConfig::Breakout(params) = config else {
            return Err(Error::InvalidArg(format!(
                "{} cannot use {} parameters",
                Self::NAME,
                config.kind()
            )));
        };
        config.validate()?;
        self.params = params.clone();
        Ok(())
    }

    fn on_tick(
        &mut self,
        symbol: &str,
        timestamp: DateTime<Utc>,
        data: &TickData,
    ) -> Result<Vec<Signal>> {
        self.history.record(symbol, timestamp, data);
        let price = to_f64(data.price());
        if price <= 0.0 {
            return Ok(Vec::new());
        }

        if self.history.has_position(symbol) {
            let rules = self.exit_rules();
            return Ok(self
                .entries
                .check_exit(symbol, price, &rules)
                .map(|reason| Signal::new(symbol, Side::Sell, data.price(), timestamp, reason))
                .into_iter()
                .collect());
        }

        let Some((support, resistance)) = self.range(symbol) else {
            return Ok(Vec::new());
        };
        if price < self.params.min_price || price > self.params.max_price {
            return Ok(Vec::new());
        }
        let volume = to_f64(data.volume());
        if volume < self.params.min_volume {
            return Ok(Vec::new());
        }

        let mid = (support + resistance) / 2.0;
        if mid <= 0.0 || (resistance - support) / mid * 100.0 < self.params.min_range_percent {
            return Ok(Vec::new());
        }

        let threshold = resistance * (1.0 + self.params.breakout_percent / 100.0);
        if price <= threshold {
            if self.pending.remove(symbol).is_some() {
                tracing::debug!(%symbol, price, threshold, "Breakout not confirmed");
            }
            return Ok(Vec::new());
        }

        let pending = self.pending.entry(symbol.to_string()).or_insert(Pending {
            support,
            resistance,
            confirmations: 0,
        });
        pending.confirmations += 1;
        if pending.confirmations < self.params.confirmation_periods {
            tracing::debug!(
                %symbol,
                confirmations = pending.confirmations,
                "Breakout pending confirmation"
            );
            return Ok(Vec::new());
        }
        self.pending.remove(symbol);

        let above = (price - resistance) / resistance * 100.0;
        tracing::info!(
            %symbol,
            price,
            support,
            resistance,
            above_percent = above,
            "Resistance breakout"
        );
        Ok(vec![Signal::new(
            symbol,
            Side::Buy,
            data.price(),
            timestamp,
            format!("Resistance breakout ({} above)", pct(above)),
        )
        .with_payload("support", support)
        .with_payload("resistance", resistance)])
    }

    fn on_order_filled(&mut self, order: &Order) -> Result<()> {
        let fallback = self.history.last_price(&order.symbol);
        self.entries.apply_fill(order, fallback);
        self.history.apply_fill(order);
        Ok(())
    }

    fn close_positions(&mut self) -> Result<Vec<Signal>> {
        Ok(self.history.close_signals())
    }

    fn has_position(&self, symbol: &str) -> bool {
        self.history.has_position(symbol)
    }
}
