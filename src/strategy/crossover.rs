//! Moving-average crossover strategy

use super::history::{History, Indicator};
use super::params::{CrossoverParams, StrategyConfig};
use super::Strategy;
use crate::error::{Error, Result};
use crate::execution::Order;
use crate::feed::TickData;
use crate::signal::{Side, Signal};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Buys when the short SMA crosses above the long SMA, sells on the reverse
///
/// The cross is judged against the relation seen at the previous evaluation
/// of the same symbol. A symbol with no previous evaluation counts as neutral,
/// so the first evaluation can signal in either direction.
pub struct DefaultStrategy {
    params: CrossoverParams,
    history: History,
    last_relation: HashMap<String, Ordering>,
}

impl DefaultStrategy {
    pub const NAME: &'static str = "MACrossover";

    pub fn new() -> Self {
        Self::with_params(CrossoverParams::default())
    }

    pub fn with_params(params: CrossoverParams) -> Self {
        Self {
            params,
            history: History::default(),
            last_relation: HashMap::new(),
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    fn evaluate(
        &mut self,
        symbol: &str,
        timestamp: DateTime<Utc>,
        data: &TickData,
    ) -> Result<Vec<Signal>> {
        if self.history.price_len(symbol) < self.params.long_period {
            return Ok(Vec::new());
        }

        let short = self
            .history
            .calculate_indicator(symbol, Indicator::Sma, self.params.short_period)?;
        let long = self
            .history
            .calculate_indicator(symbol, Indicator::Sma, self.params.long_period)?;
        if short.len() < 2 || long.len() < 2 {
            return Ok(Vec::new());
        }

        let (cur_short, cur_long) = (short[short.len() - 1], long[long.len() - 1]);
        let Some(current) = cur_short.partial_cmp(&cur_long) else {
            return Ok(Vec::new());
        };
        let previous = self.last_relation.insert(symbol.to_string(), current);

        let crossed_up = current == Ordering::Greater && previous != Some(Ordering::Greater);
        let crossed_down = current == Ordering::Less && previous != Some(Ordering::Less);
        let has_position = self.history.has_position(symbol);

        let (side, reason) = if crossed_up && !has_position {
            (Side::Buy, "MA Crossover (Bullish)")
        } else if crossed_down && has_position {
            (Side::Sell, "MA Crossover (Bearish)")
        } else {
            return Ok(Vec::new());
        };

        tracing::info!(
            %symbol,
            %side,
            short_ma = cur_short,
            long_ma = cur_long,
            "Crossover signal"
        );
        Ok(vec![Signal::new(symbol, side, data.price(), timestamp, reason)
            .with_payload("short_ma", cur_short)
            .with_payload("long_ma", cur_long)])
    }
}

impl Default for DefaultStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for DefaultStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn initialize(&mut self, config: &StrategyConfig) -> Result<()> {
        self.update_params(config)?;
        self.history.reset();
        self.last_relation.clear();
        Ok(())
    }

    fn params(&self) -> StrategyConfig {
        StrategyConfig::Default(self.params.clone())
    }

    fn update_params(&mut self, config: &StrategyConfig) -> Result<()> {
        let StrategyConfig::Default(params) = config else {
            return Err(Error::InvalidArg(format!(
                "{} cannot use {} parameters",
                Self::NAME,
                config.kind()
            )));
        };
        config.validate()?;
        self.params = params.clone();
        self.last_relation.clear();
        Ok(())
    }

    fn on_tick(
        &mut self,
        symbol: &str,
        timestamp: DateTime<Utc>,
        data: &TickData,
    ) -> Result<Vec<Signal>> {
        self.history.record(symbol, timestamp, data);
        self.evaluate(symbol, timestamp, data)
    }

    fn on_order_filled(&mut self, order: &Order) -> Result<()> {
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
