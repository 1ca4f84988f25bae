//! Volume spike strategy

use super::exits::{Entries, ExitRules};
use super::history::{to_f64, History};
use super::params::{StrategyConfig, VolumeSpikeParams};
use super::Strategy;
use crate::error::{Error, Result};
use crate::execution::Order;
use crate::feed::TickData;
use crate::signal::{pct, Side, Signal};
use chrono::{DateTime, Utc};

/// Buys when volume jumps above its recent average, exits on TP, SL or age
pub struct VolumeSpikeStrategy {
    params: VolumeSpikeParams,
    history: History,
    entries: Entries,
}

impl VolumeSpikeStrategy {
    pub const NAME: &'static str = "VolumeSpike";

    pub fn new() -> Self {
        Self::with_params(VolumeSpikeParams::default())
    }

    pub fn with_params(params: VolumeSpikeParams) -> Self {
        Self {
            params,
            history: History::default(),
            entries: Entries::default(),
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    fn exit_rules(&self) -> ExitRules {
        ExitRules {
            take_profit_percent: self.params.take_profit_percent,
            stop_loss_percent: self.params.stop_loss_percent,
            max_bars: Some(self.params.exit_after_bars),
        }
    }

    /// Percent increase of the current volume over the previous `lookback` bars
    fn volume_increase(&self, symbol: &str, current: f64) -> Option<f64> {
        let volumes = self.history.volumes(symbol)?;
        let lookback = self.params.lookback_period;
        if volumes.len() <= lookback {
            return None;
        }
        let last = volumes.len() - 1;
        let avg = (1..=lookback).map(|i| volumes[last - i]).sum::<f64>() / lookback as f64;
        if avg <= 0.0 {
            return None;
        }
        Some((current - avg) / avg * 100.0)
    }
}

impl Default for VolumeSpikeStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for VolumeSpikeStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn initialize(&mut self, config: &StrategyConfig) -> Result<()> {
        self.update_params(config)?;
        self.history.reset();
        self.entries.clear();
        Ok(())
    }

    fn params(&self) -> StrategyConfig {
        StrategyConfig::VolumeSpike(self.params.clone())
    }

    fn update_params(&mut self, config: &StrategyConfig) -> Result<()> {
        let StrategyConfig::VolumeSpike(params) = config else {
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

        if price < self.params.min_price || price > self.params.max_price {
            return Ok(Vec::new());
        }
        let volume = to_f64(data.volume());
        if volume <= 0.0 || volume < self.params.min_volume {
            return Ok(Vec::new());
        }

        let Some(increase) = self.volume_increase(symbol, volume) else {
            return Ok(Vec::new());
        };
        if increase < self.params.volume_threshold_percent {
            return Ok(Vec::new());
        }

        tracing::info!(
            %symbol,
            volume,
            increase_percent = increase,
            price,
            "Volume spike detected"
        );
        let reason = format!(
            "Volume spike detected ({} increase, threshold {} increase)",
            pct(increase),
            pct(self.params.volume_threshold_percent)
        );
        Ok(vec![Signal::new(symbol, Side::Buy, data.price(), timestamp, reason)
            .with_payload("volume", volume)
            .with_payload("volume_increase_percent", increase)])
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn strategy() -> VolumeSpikeStrategy {
        VolumeSpikeStrategy::with_params(VolumeSpikeParams {
            volume_threshold_percent: 200.0,
            lookback_period: 5,
            min_volume: 100.0,
            ..VolumeSpikeParams::default()
        })
    }

    fn run(
        strategy: &mut VolumeSpikeStrategy,
        ticks: &[(Decimal, Decimal)],
    ) -> Vec<(usize, Signal)> {
        let start = Utc::now();
        let mut out = Vec::new();
        for (i, (price, volume)) in ticks.iter().enumerate() {
            let ts = start + Duration::minutes(i as i64);
            let data = TickData::ticker(*price, *volume);
            for signal in strategy.on_tick("BTCUSDT", ts, &data).unwrap() {
                out.push((i + 1, signal));
            }
        }
        out
    }

    #[test]
    fn test_spike_detected() {
        let mut strategy = strategy();
        let ticks: Vec<_> = [100, 100, 100, 100, 100, 400]
            .iter()
            .map(|v| (dec!(50), Decimal::from(*v)))
            .collect();
        let signals = run(&mut strategy, &ticks);

        assert_eq!(signals.len(), 1);
        let (tick, signal) = &signals[0];
        assert_eq!(*tick, 6);
        assert_eq!(signal.side, Side::Buy);
        assert!(signal.reason.contains("200.00% increase"));
        assert_eq!(
            signal.reason,
            "Volume spike detected (300.00% increase, threshold 200.00% increase)"
        );
    }

    #[test]
    fn test_below_threshold() {
        let mut strategy = strategy();
        let ticks: Vec<_> = [100, 100, 100, 100, 100, 250]
            .iter()
            .map(|v| (dec!(50), Decimal::from(*v)))
            .collect();
        assert!(run(&mut strategy, &ticks).is_empty());
    }

    #[test]
    fn test_price_band() {
        let mut strategy = strategy();
        let ticks: Vec<_> = [100, 100, 100, 100, 100, 400]
            .iter()
            .map(|v| (dec!(5000), Decimal::from(*v)))
            .collect();
        assert!(run(&mut strategy, &ticks).is_empty());
    }

    #[test]
    fn test_position_exits() {
        let mut strategy = strategy();
        run(&mut strategy, &[(dec!(50), dec!(100))]);
        strategy
            .on_order_filled(&Order::limit("BTCUSDT", Side::Buy, dec!(1), dec!(50)))
            .unwrap();

        let signals = run(
            &mut strategy,
            &[(dec!(51), dec!(100)), (dec!(60), dec!(100))],
        );
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].0, 2);
        assert_eq!(signals[0].1.side, Side::Sell);
        assert_eq!(signals[0].1.reason, "Take profit triggered (20.00%)");

        strategy
            .on_order_filled(&Order::market("BTCUSDT", Side::Sell, dec!(1)))
            .unwrap();
        assert!(!strategy.has_position("BTCUSDT"));
    }

    #[test]
    fn test_time_exit() {
        let mut strategy = VolumeSpikeStrategy::with_params(VolumeSpikeParams {
            exit_after_bars: 3,
            ..VolumeSpikeParams::default()
        });
        strategy
            .on_order_filled(&Order::limit("BTCUSDT", Side::Buy, dec!(1), dec!(50)))
            .unwrap();
        let signals = run(&mut strategy, &[(dec!(50), dec!(1)); 3]);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].0, 3);
        assert_eq!(signals[0].1.reason, "Time-based exit after 3 bars (0.00%)");
    }
}
