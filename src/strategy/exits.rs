//! Entry tracking and take-profit / stop-loss / time exits

use crate::execution::Order;
use crate::signal::{pct, Side};
use std::collections::HashMap;

/// Exit thresholds, in percent of the entry price
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ExitRules {
    pub take_profit_percent: f64,
    pub stop_loss_percent: f64,
    /// Bars after which the position is closed regardless of P&L
    pub max_bars: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    price: f64,
    bars: u32,
}

/// Entry price and bar count per open symbol
#[derive(Debug, Clone, Default)]
pub(crate) struct Entries {
    open: HashMap<String, Entry>,
}

impl Entries {
    pub fn clear(&mut self) {
        self.open.clear();
    }

    /// Track a fill; `fallback` is used when the order carries no price
    pub fn apply_fill(&mut self, order: &Order, fallback: Option<f64>) {
        match order.side {
            Side::Buy => {
                let price = fill_price(order).or(fallback).unwrap_or(0.0);
                self.open
                    .insert(order.symbol.clone(), Entry { price, bars: 0 });
            }
            Side::Sell => {
                self.open.remove(&order.symbol);
            }
            Side::Hold => {}
        }
    }

    pub fn entry_price(&self, symbol: &str) -> Option<f64> {
        self.open.get(symbol).map(|e| e.price)
    }

    /// Count a bar for an open position and return the exit reason, if any
    ///
    /// Take profit is checked before stop loss, and both before the bar limit.
    pub fn check_exit(&mut self, symbol: &str, price: f64, rules: &ExitRules) -> Option<String> {
        let Some(entry) = self.open.get_mut(symbol) else {
            tracing::warn!(
                %symbol,
                current_price = price,
                "Position exists but no entry price found"
            );
            return None;
        };
        entry.bars += 1;
        if entry.price <= 0.0 {
            return None;
        }

        let pnl = (price - entry.price) / entry.price * 100.0;
        if pnl >= rules.take_profit_percent {
            tracing::info!(
                %symbol,
                entry_price = entry.price,
                current_price = price,
                pnl_percent = pnl,
                "Take profit triggered"
            );
            return Some(format!("Take profit triggered ({})", pct(pnl)));
        }
        if pnl <= -rules.stop_loss_percent {
            tracing::info!(
                %symbol,
                entry_price = entry.price,
                current_price = price,
                pnl_percent = pnl,
                "Stop loss triggered"
            );
            return Some(format!("Stop loss triggered ({})", pct(pnl)));
        }
        match rules.max_bars {
            Some(max) if entry.bars >= max => {
                tracing::info!(
                    %symbol,
                    bars = entry.bars,
                    pnl_percent = pnl,
                    "Time-based exit triggered"
                );
                Some(format!("Time-based exit after {} bars ({})", entry.bars, pct(pnl)))
            }
            _ => None,
        }
    }
}

fn fill_price(order: &Order) -> Option<f64> {
    [order.avg_fill_price, order.price]
        .into_iter()
        .map(super::history::to_f64)
        .find(|p| *p > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const RULES: ExitRules = ExitRules {
        take_profit_percent: 15.0,
        stop_loss_percent: 5.0,
        max_bars: Some(3),
    };

    fn entries_at(price: rust_decimal::Decimal) -> Entries {
        let mut entries = Entries::default();
        entries.apply_fill(&Order::limit("BTCUSDT", Side::Buy, dec!(1), price), None);
        entries
    }

    #[test]
    fn test_take_profit() {
        let mut entries = entries_at(dec!(100));
        let reason = entries.check_exit("BTCUSDT", 120.0, &RULES).unwrap();
        assert_eq!(reason, "Take profit triggered (20.00%)");
    }

    #[test]
    fn test_stop_loss() {
        let mut entries = entries_at(dec!(100));
        let reason = entries.check_exit("BTCUSDT", 90.0, &RULES).unwrap();
        assert_eq!(reason, "Stop loss triggered (-10.00%)");
    }

    #[test]
    fn test_take_profit_wins_over_time_exit() {
        let mut entries = entries_at(dec!(100));
        assert!(entries.check_exit("BTCUSDT", 101.0, &RULES).is_none());
        assert!(entries.check_exit("BTCUSDT", 101.0, &RULES).is_none());
        let reason = entries.check_exit("BTCUSDT", 120.0, &RULES).unwrap();
        assert!(reason.starts_with("Take profit"));
    }

    #[test]
    fn test_time_exit() {
        let mut entries = entries_at(dec!(100));
        entries.check_exit("BTCUSDT", 101.0, &RULES);
        entries.check_exit("BTCUSDT", 101.0, &RULES);
        let reason = entries.check_exit("BTCUSDT", 102.0, &RULES).unwrap();
        assert_eq!(reason, "Time-based exit after 3 bars (2.00%)");
    }

    #[test]
    fn test_no_time_exit_without_limit() {
        let rules = ExitRules {
            max_bars: None,
            ..RULES
        };
        let mut entries = entries_at(dec!(100));
        for _ in 0..50 {
            assert!(entries.check_exit("BTCUSDT", 100.0, &rules).is_none());
        }
    }

    #[test]
    fn test_fill_price_fallbacks() {
        let mut entries = Entries::default();
        let mut order = Order::market("ETHUSDT", Side::Buy, dec!(1));
        order.avg_fill_price = dec!(2000);
        entries.apply_fill(&order, Some(1.0));
        assert_eq!(entries.entry_price("ETHUSDT"), Some(2000.0));

        entries.apply_fill(&Order::market("SOLUSDT", Side::Buy, dec!(1)), Some(150.0));
        assert_eq!(entries.entry_price("SOLUSDT"), Some(150.0));

        entries.apply_fill(&Order::market("ETHUSDT", Side::Sell, dec!(1)), None);
        assert_eq!(entries.entry_price("ETHUSDT"), None);
    }
}
