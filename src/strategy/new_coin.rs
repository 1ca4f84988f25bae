//! New listing strategy

use super::exits::{Entries, ExitRules};
use super::history::{to_f64, History};
use super::params::{NewCoinParams, StrategyConfig};
use super::Strategy;
use crate::error::{Error, Result};
use crate::execution::Order;
use crate::feed::TickData;
use crate::signal::{Side, Signal};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Buys symbols shortly after they first appear, exits on TP or SL
pub struct NewCoinStrategy {
    params: NewCoinParams,
    history: History,
    entries: Entries,
    first_seen: HashMap<String, DateTime<Utc>>,
}

impl NewCoinStrategy {
    pub const NAME: &'static str = "NewCoin";

    pub fn new() -> Self {
        Self::with_params(NewCoinParams::default())
    }

    pub fn with_params(params: NewCoinParams) -> Self {
        Self {
            params,
            history: History::default(),
            entries: Entries::default(),
            first_seen: HashMap::new(),
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// When the symbol was first seen inside the price band
    pub fn first_seen(&self, symbol: &str) -> Option<DateTime<Utc>> {
        self.first_seen.get(symbol).copied()
    }

    fn in_band(&self, price: f64) -> bool {
        price >= self.params.min_price && price <= self.params.max_price
    }
}

impl Default for NewCoinStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for NewCoinStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn initialize(&mut self, config: &StrategyConfig) -> Result<()> {
        self.update_params(config)?;
        self.history.reset();
        self.entries.clear();
        self.first_seen.clear();
        Ok(())
    }

    fn params(&self) -> StrategyConfig {
        StrategyConfig::NewCoin(self.params.clone())
    }

    fn update_params(&mut self, config: &StrategyConfig) -> Result<()> {
        let StrategyConfig::NewCoin(params) = config else {
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
            let rules = ExitRules {
                take_profit_percent: self.params.take_profit_percent,
                stop_loss_percent: self.params.stop_loss_percent,
                max_bars: None,
            };
            return Ok(self
                .entries
                .check_exit(symbol, price, &rules)
                .map(|reason| Signal::new(symbol, Side::Sell, data.price(), timestamp, reason))
                .into_iter()
                .collect());
        }

        let Some(first_seen) = self.first_seen(symbol) else {
            if self.in_band(price) {
                tracing::info!(%symbol, %timestamp, price, "New coin detected");
                self.first_seen.insert(symbol.to_string(), timestamp);
            }
            return Ok(Vec::new());
        };

        let age = timestamp - first_seen;
        if age > Duration::hours(self.params.max_age_hours) {
            tracing::debug!(%symbol, "Coin too old, no longer tracked");
            self.first_seen.remove(symbol);
            return Ok(Vec::new());
        }

        let volume = to_f64(data.volume());
        if !self.in_band(price)
            || volume < self.params.min_volume
            || age < Duration::minutes(self.params.entry_delay_minutes)
        {
            return Ok(Vec::new());
        }

        tracing::info!(%symbol, price, volume, age_secs = age.num_seconds(), "New coin entry");
        Ok(vec![Signal::new(
            symbol,
            Side::Buy,
            data.price(),
            timestamp,
            format!("New coin detected {} ago", format_age(age)),
        )
        .with_payload("first_seen", first_seen.to_rfc3339())])
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

/// Compact age such as `1h5m0s`, `5m30s` or `42s`
fn format_age(age: Duration) -> String {
    let secs = age.num_seconds().max(0);
    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if h > 0 {
        format!("{}h{}m{}s", h, m, s)
    } else if m > 0 {
        format!("{}m{}s", m, s)
    } else {
        format!("{}s", s)
    }
}
