//! Shared fixtures

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use std::future::Future;
use strategy_core::feed::{Tick, TickData};
use strategy_core::signal::Signal;
use strategy_core::strategy::Strategy;

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// One ticker tick per (price, volume), a minute apart
pub fn ticks(symbol: &str, series: &[(Decimal, Decimal)]) -> Vec<Tick> {
    series
        .iter()
        .enumerate()
        .map(|(i, (price, volume))| {
            Tick::new(
                symbol,
                start_time() + Duration::minutes(i as i64),
                TickData::ticker(*price, *volume),
            )
        })
        .collect()
}

/// Feed ticks to a strategy, returning each signal with its 1-based tick index
pub fn replay(strategy: &mut dyn Strategy, ticks: &[Tick]) -> Vec<(usize, Signal)> {
    let mut out = Vec::new();
    for (i, tick) in ticks.iter().enumerate() {
        let signals = strategy
            .on_tick(&tick.symbol, tick.timestamp, &tick.data)
            .unwrap();
        out.extend(signals.into_iter().map(|s| (i + 1, s)));
    }
    out
}

/// Poll `check` until it holds or a second passes
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    false
}
