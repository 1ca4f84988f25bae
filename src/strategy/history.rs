//! Per-symbol history, position flags and indicator cache

use crate::error::{Error, Result};
use crate::execution::Order;
use crate::feed::TickData;
use crate::indicators;
use crate::signal::{Side, Signal};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet, VecDeque};

/// Default maximum number of points kept per symbol
pub const DEFAULT_MAX_HISTORY: usize = 1000;

/// Bollinger band width used by the cache
const BOLLINGER_K: f64 = 2.0;

/// MACD periods used by the cache
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;

/// Indicators that can be computed from a symbol's price history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    Sma,
    Ema,
    Rsi,
    BollingerUpper,
    BollingerMiddle,
    BollingerLower,
    Macd,
    MacdSignal,
    MacdHistogram,
}

type CacheKey = (String, Indicator, usize);

/// History and position bookkeeping shared by every strategy
///
/// Strategies hold one of these by value. Price and volume series are
/// bounded ring buffers; the indicator cache is invalidated for a symbol
/// whenever that symbol's history changes.
#[derive(Debug, Clone)]
pub struct History {
    max_len: usize,
    prices: HashMap<String, VecDeque<f64>>,
    volumes: HashMap<String, VecDeque<f64>>,
    positions: HashSet<String>,
    last_timestamp: Option<DateTime<Utc>>,
    cache: HashMap<CacheKey, Vec<f64>>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl History {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len: max_len.max(1),
            prices: HashMap::new(),
            volumes: HashMap::new(),
            positions: HashSet::new(),
            last_timestamp: None,
            cache: HashMap::new(),
        }
    }

    /// Drop all history, positions and cached values
    pub fn reset(&mut self) {
        self.prices.clear();
        self.volumes.clear();
        self.positions.clear();
        self.last_timestamp = None;
        self.cache.clear();
    }

    /// Record a tick; zero prices and volumes are not appended
    pub fn record(&mut self, symbol: &str, timestamp: DateTime<Utc>, data: &TickData) {
        self.last_timestamp = Some(timestamp);

        let price = to_f64(data.price());
        if price > 0.0 {
            push_bounded(
                self.prices.entry(symbol.to_string()).or_default(),
                price,
                self.max_len,
            );
        }

        let volume = to_f64(data.volume());
        if volume > 0.0 {
            push_bounded(
                self.volumes.entry(symbol.to_string()).or_default(),
                volume,
                self.max_len,
            );
        }

        self.invalidate(symbol);
    }

    /// Maximum points kept per symbol
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Price series for a symbol, oldest first
    pub fn prices(&self, symbol: &str) -> Option<&VecDeque<f64>> {
        self.prices.get(symbol)
    }

    /// Volume series for a symbol, oldest first
    pub fn volumes(&self, symbol: &str) -> Option<&VecDeque<f64>> {
        self.volumes.get(symbol)
    }

    pub fn price_len(&self, symbol: &str) -> usize {
        self.prices.get(symbol).map_or(0, VecDeque::len)
    }

    pub fn volume_len(&self, symbol: &str) -> usize {
        self.volumes.get(symbol).map_or(0, VecDeque::len)
    }

    /// Most recent recorded price
    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).and_then(|p| p.back().copied())
    }

    /// Timestamp of the last recorded tick
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains(symbol)
    }

    pub fn set_position(&mut self, symbol: &str, open: bool) {
        if open {
            self.positions.insert(symbol.to_string());
        } else {
            self.positions.remove(symbol);
        }
    }

    /// Symbols with an open position, sorted
    pub fn open_positions(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.positions.iter().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Apply a fill: a BUY opens the position, anything else closes it
    pub fn apply_fill(&mut self, order: &Order) {
        let open = order.side == Side::Buy;
        self.set_position(&order.symbol, open);
        if open {
            tracing::info!(
                symbol = %order.symbol,
                price = %order.price,
                quantity = %order.quantity,
                "Long position opened"
            );
        } else {
            tracing::info!(
                symbol = %order.symbol,
                price = %order.price,
                quantity = %order.quantity,
                "Position closed"
            );
        }
    }

    /// SELL signals for every open position, stamped with the last tick time
    pub fn close_signals(&self) -> Vec<Signal> {
        let timestamp = self.last_timestamp.unwrap_or_else(Utc::now);
        self.open_positions()
            .into_iter()
            .map(|symbol| {
                tracing::info!(%symbol, "Closing position at end of run");
                Signal::new(
                    symbol,
                    Side::Sell,
                    Decimal::ZERO,
                    timestamp,
                    "End of backtest - closing position",
                )
                .with_quantity(Decimal::ZERO)
            })
            .collect()
    }

    /// Compute an indicator over the symbol's prices, reusing the cached value
    pub fn calculate_indicator(
        &mut self,
        symbol: &str,
        indicator: Indicator,
        period: usize,
    ) -> Result<Vec<f64>> {
        let key = (symbol.to_string(), indicator, period);
        if let Some(values) = self.cache.get(&key) {
            return Ok(values.clone());
        }

        let prices: Vec<f64> = match self.prices.get(symbol) {
            Some(p) => p.iter().copied().collect(),
            None => Vec::new(),
        };
        if prices.len() < period {
            return Err(Error::InvalidArg(format!(
                "not enough history for {}: have {}, need {}",
                symbol,
                prices.len(),
                period
            )));
        }

        let values = match indicator {
            Indicator::Sma => indicators::sma(&prices, period)?,
            Indicator::Ema => indicators::ema(&prices, period)?,
            Indicator::Rsi => indicators::rsi(&prices, period)?,
            Indicator::BollingerUpper => {
                indicators::bollinger_bands(&prices, period, BOLLINGER_K)?.upper
            }
            Indicator::BollingerMiddle => {
                indicators::bollinger_bands(&prices, period, BOLLINGER_K)?.middle
            }
            Indicator::BollingerLower => {
                indicators::bollinger_bands(&prices, period, BOLLINGER_K)?.lower
            }
            Indicator::Macd => indicators::macd(&prices, MACD_FAST, MACD_SLOW, MACD_SIGNAL)?.macd,
            Indicator::MacdSignal => {
                indicators::macd(&prices, MACD_FAST, MACD_SLOW, MACD_SIGNAL)?.signal
            }
            Indicator::MacdHistogram => {
                indicators::macd(&prices, MACD_FAST, MACD_SLOW, MACD_SIGNAL)?.histogram
            }
        };

        self.cache.insert(key, values.clone());
        Ok(values)
    }

    /// Empty the indicator cache for every symbol
    pub fn clear_indicator_cache(&mut self) {
        self.cache.clear();
    }

    /// Number of cached indicator results
    pub fn cached_indicators(&self) -> usize {
        self.cache.len()
    }

    fn invalidate(&mut self, symbol: &str) {
        self.cache.retain(|(cached, _, _), _| cached != symbol);
    }
}

fn push_bounded(series: &mut VecDeque<f64>, value: f64, max_len: usize) {
    series.push_back(value);
    while series.len() > max_len {
        series.pop_front();
    }
}

/// Decimal to f64 for indicator math
pub(crate) fn to_f64(value: Decimal) -> f64 {
    value.try_into().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::Order;
    use rust_decimal_macros::dec;

    fn tick(price: Decimal, volume: Decimal) -> TickData {
        TickData::ticker(price, volume)
    }

    #[test]
    fn test_zero_values_not_recorded() {
        let mut history = History::default();
        let now = Utc::now();
        history.record("BTCUSDT", now, &tick(dec!(100), dec!(0)));
        history.record("BTCUSDT", now, &tick(dec!(0), dec!(5)));

        assert_eq!(history.price_len("BTCUSDT"), 1);
        assert_eq!(history.volume_len("BTCUSDT"), 1);
        assert_eq!(history.last_timestamp(), Some(now));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut history = History::new(5);
        for i in 1..=12 {
            history.record("ETHUSDT", Utc::now(), &tick(Decimal::from(i), dec!(1)));
        }
        let prices: Vec<f64> = history.prices("ETHUSDT").unwrap().iter().copied().collect();
        assert_eq!(prices, vec![8.0, 9.0, 10.0, 11.0, 12.0]);
        assert_eq!(history.volume_len("ETHUSDT"), 5);
    }

    #[test]
    fn test_cache_invalidated_on_update() {
        let mut history = History::default();
        for i in 1..=5 {
            history.record("BTCUSDT", Utc::now(), &tick(Decimal::from(i), dec!(1)));
        }
        history.record("ETHUSDT", Utc::now(), &tick(dec!(10), dec!(1)));

        let first = history
            .calculate_indicator("BTCUSDT", Indicator::Sma, 5)
            .unwrap();
        assert_eq!(first, vec![3.0]);
        history
            .calculate_indicator("ETHUSDT", Indicator::Sma, 1)
            .unwrap();
        assert_eq!(history.cached_indicators(), 2);

        history.record("BTCUSDT", Utc::now(), &tick(dec!(6), dec!(1)));
        assert_eq!(history.cached_indicators(), 1);

        let second = history
            .calculate_indicator("BTCUSDT", Indicator::Sma, 5)
            .unwrap();
        assert_eq!(second, vec![3.0, 4.0]);

        history.clear_indicator_cache();
        assert_eq!(history.cached_indicators(), 0);
    }

    #[test]
    fn test_indicator_needs_history() {
        let mut history = History::default();
        history.record("BTCUSDT", Utc::now(), &tick(dec!(1), dec!(1)));
        let err = history
            .calculate_indicator("BTCUSDT", Indicator::Ema, 3)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArg(_)));
        assert!(history.calculate_indicator("NONE", Indicator::Sma, 1).is_err());
    }

    #[test]
    fn test_bollinger_and_macd_from_cache() {
        let mut history = History::default();
        for i in 0..40 {
            let data = tick(Decimal::from(100 + i), dec!(1));
            history.record("BTCUSDT", Utc::now(), &data);
        }
        let upper = history
            .calculate_indicator("BTCUSDT", Indicator::BollingerUpper, 20)
            .unwrap();
        let lower = history
            .calculate_indicator("BTCUSDT", Indicator::BollingerLower, 20)
            .unwrap();
        assert_eq!(upper.len(), 21);
        assert!(upper[0] > lower[0]);

        let hist = history
            .calculate_indicator("BTCUSDT", Indicator::MacdHistogram, 26)
            .unwrap();
        assert!(!hist.is_empty());
    }

    #[test]
    fn test_fill_toggles_position() {
        let mut history = History::default();
        history.apply_fill(&Order::market("BTCUSDT", Side::Buy, dec!(1)));
        assert!(history.has_position("BTCUSDT"));

        history.apply_fill(&Order::market("BTCUSDT", Side::Sell, dec!(1)));
        assert!(!history.has_position("BTCUSDT"));
    }

    #[test]
    fn test_close_signals_use_last_tick_time() {
        let mut history = History::default();
        let ts = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        history.record("BTCUSDT", ts, &tick(dec!(100), dec!(1)));
        history.set_position("BTCUSDT", true);
        history.set_position("ETHUSDT", true);

        let signals = history.close_signals();
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].symbol, "BTCUSDT");
        assert_eq!(signals[0].side, Side::Sell);
        assert_eq!(signals[0].quantity, Decimal::ZERO);
        assert_eq!(signals[0].price, Decimal::ZERO);
        assert_eq!(signals[0].timestamp, ts);
        assert_eq!(signals[0].reason, "End of backtest - closing position");
    }
}
