//! End-to-end pipeline tests

use crate::common::ticks;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use strategy_core::cli::Pipeline;
use strategy_core::config::Config;
use strategy_core::executor::StrategyState;
use strategy_core::signal::Side;

#[test]
fn test_config_example_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example");
    let config = Config::load(path).unwrap();
    assert!(!config.strategies.is_empty());
    for entry in &config.strategies {
        entry.strategy_config().unwrap();
    }
}

fn pipeline_config() -> Config {
    toml::from_str(
        r#"
        [paper]
        fee_rate = 0

        [[strategies]]
        id = "ma-fast"
        kind = "default"
        params = { short_period = 2, long_period = 4 }
        "#,
    )
    .unwrap()
}

#[tokio::test]
async fn test_crossover_orders_reach_exchange_and_monitor() {
    let pipeline = Pipeline::build(&pipeline_config()).await.unwrap();

    // down, then a sharp rally crosses the short average above the long one
    let series: Vec<(Decimal, Decimal)> = [20, 19, 18, 17, 16, 25, 30, 32]
        .iter()
        .map(|p| (Decimal::from(*p), dec!(1)))
        .collect();
    let mut emitted = Vec::new();
    for tick in ticks("BTCUSDT", &series) {
        emitted.extend(pipeline.feed(&tick).await);
    }
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].side, Side::Buy);
    assert_eq!(emitted[0].strategy_id, "ma-fast");

    let summary = pipeline.finish().await.unwrap();
    let placed = pipeline.exchange.placed_orders().await;
    assert!(!placed.is_empty());
    assert_eq!(placed[0].side, Side::Buy);
    assert_eq!(placed[0].strategy_id, "ma-fast");

    let status = &summary.statuses[0];
    assert_eq!(status.id, "ma-fast");
    assert_eq!(status.status, StrategyState::Stopped);
    assert!(status.signals_handled >= 1);
    assert!(summary.stats.placed >= 1);
}

#[tokio::test]
async fn test_blocked_symbol_never_placed() {
    let mut config = pipeline_config();
    config.risk.blocked_symbols = vec!["BTCUSDT".into()];
    let pipeline = Pipeline::build(&config).await.unwrap();

    let series: Vec<(Decimal, Decimal)> = [20, 19, 18, 17, 16, 25, 30, 32]
        .iter()
        .map(|p| (Decimal::from(*p), dec!(1)))
        .collect();
    for tick in ticks("BTCUSDT", &series) {
        pipeline.feed(&tick).await;
    }
    let summary = pipeline.finish().await.unwrap();

    assert!(pipeline.exchange.placed_orders().await.is_empty());
    assert_eq!(summary.stats.placed, 0);
    assert!(summary.stats.failed >= 1);
}
