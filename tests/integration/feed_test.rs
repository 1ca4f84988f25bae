//! Tick file replay tests

use crate::common::ticks;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::io::Write;
use strategy_core::cli::Pipeline;
use strategy_core::config::Config;
use strategy_core::feed::{JsonLinesFeed, TickFeed};

#[tokio::test]
async fn test_replay_file_through_pipeline() {
    let series: Vec<(Decimal, Decimal)> = (1..=40)
        .map(|i| (Decimal::from(100 + i), dec!(5)))
        .collect();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for tick in ticks("ETHUSDT", &series) {
        writeln!(file, "{}", serde_json::to_string(&tick).unwrap()).unwrap();
    }
    writeln!(file, "{{ broken").unwrap();

    let pipeline = Pipeline::build(&Config::default()).await.unwrap();
    let mut rx = JsonLinesFeed::new(file.path()).subscribe().await.unwrap();
    let mut count = 0;
    while let Some(tick) = rx.recv().await {
        pipeline.feed(&tick).await;
        count += 1;
    }
    assert_eq!(count, 40);

    let summary = pipeline.finish().await.unwrap();
    assert_eq!(summary.statuses.len(), 1);
    assert_eq!(summary.statuses[0].id, "default");
}

#[tokio::test]
async fn test_missing_file_fails() {
    let feed = JsonLinesFeed::new("/nonexistent/ticks.jsonl");
    assert!(feed.subscribe().await.is_err());
}
