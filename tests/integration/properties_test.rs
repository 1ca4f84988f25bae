//! Property tests over indicators, history, strategies and order tracking

use crate::common::{start_time, ticks};
use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use strategy_core::execution::{Order, OrderStatus, OrderTracker};
use strategy_core::feed::TickData;
use strategy_core::indicators::{ema, sma};
use strategy_core::signal::{PriorityQueue, Side};
use strategy_core::strategy::Strategy as _;
use strategy_core::strategy::{CrossoverParams, DefaultStrategy, History, StrategyConfig};

fn series() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.01f64..10_000.0, 1..64)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

fn status() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::New),
        Just(OrderStatus::PartiallyFilled),
        Just(OrderStatus::Filled),
        Just(OrderStatus::Canceled),
        Just(OrderStatus::Rejected),
        Just(OrderStatus::Expired),
    ]
}

type Emitted = (Side, String, Decimal, DateTime<Utc>, String);

fn run_crossover(prices: &[u32]) -> Vec<Emitted> {
    let mut strategy = DefaultStrategy::new();
    strategy
        .initialize(&StrategyConfig::Default(CrossoverParams {
            short_period: 3,
            long_period: 7,
        }))
        .unwrap();

    let series: Vec<(Decimal, Decimal)> = prices
        .iter()
        .map(|p| (Decimal::from(*p), Decimal::ONE))
        .collect();
    let mut out = Vec::new();
    for tick in ticks("ETHUSDT", &series) {
        let signals = strategy
            .on_tick(&tick.symbol, tick.timestamp, &tick.data)
            .unwrap();
        for signal in signals {
            // fills arrive immediately in this harness
            let order = Order::market(&signal.symbol, signal.side, Decimal::ONE);
            strategy.on_order_filled(&order).unwrap();
            out.push((
                signal.side,
                signal.symbol,
                signal.price,
                signal.timestamp,
                signal.reason,
            ));
        }
    }
    out
}

proptest! {
    #[test]
    fn prop_history_bounded(
        max_len in 1usize..50,
        prices in prop::collection::vec(1u32..1000, 0..200),
    ) {
        let mut history = History::new(max_len);
        for (i, price) in prices.iter().enumerate() {
            history.record(
                "BTCUSDT",
                start_time() + Duration::minutes(i as i64),
                &TickData::ticker(Decimal::from(*price), Decimal::ONE),
            );
            prop_assert!(history.price_len("BTCUSDT") <= history.max_len());
            prop_assert!(history.volume_len("BTCUSDT") <= history.max_len());
        }
    }

    #[test]
    fn prop_position_follows_last_fill(sides in prop::collection::vec(any::<bool>(), 1..20)) {
        let mut strategy = DefaultStrategy::new();
        for buy in sides {
            let side = if buy { Side::Buy } else { Side::Sell };
            strategy
                .on_order_filled(&Order::market("SOLUSDT", side, Decimal::ONE))
                .unwrap();
            prop_assert_eq!(strategy.has_position("SOLUSDT"), buy);
        }
    }

    #[test]
    fn prop_sma_identity(data in series()) {
        let unit = sma(&data, 1).unwrap();
        prop_assert_eq!(unit.len(), data.len());
        for (a, b) in unit.iter().zip(&data) {
            prop_assert!(close(*a, *b));
        }

        let whole = sma(&data, data.len()).unwrap();
        let mean = data.iter().sum::<f64>() / data.len() as f64;
        prop_assert_eq!(whole.len(), 1);
        prop_assert!(close(whole[0], mean));
    }

    #[test]
    fn prop_ema_unit_period(data in series()) {
        let unit = ema(&data, 1).unwrap();
        prop_assert_eq!(unit.len(), data.len());
        for (a, b) in unit.iter().zip(&data) {
            prop_assert!(close(*a, *b));
        }
    }

    #[test]
    fn prop_crossover_deterministic(prices in prop::collection::vec(1u32..200, 0..120)) {
        prop_assert_eq!(run_crossover(&prices), run_crossover(&prices));
    }

    #[test]
    fn prop_full_queue_keeps_contents(
        capacity in 1usize..16,
        items in prop::collection::vec((0u32..1000, -5i32..5), 0..40),
    ) {
        let mut queue = PriorityQueue::new(capacity);
        let mut accepted = Vec::new();
        for (item, priority) in items {
            match queue.push(item, priority) {
                Ok(()) => accepted.push((item, priority)),
                Err(rejected) => {
                    prop_assert_eq!(rejected, item);
                    prop_assert_eq!(queue.len(), capacity);
                }
            }
        }

        // highest priority first, FIFO within a priority
        accepted.sort_by(|a, b| b.1.cmp(&a.1));
        let expected: Vec<u32> = accepted.into_iter().map(|(item, _)| item).collect();
        let mut drained = Vec::new();
        while let Some(item) = queue.pop() {
            drained.push(item);
        }
        prop_assert_eq!(drained, expected);
    }

    #[test]
    fn prop_tracked_status_never_regresses(updates in prop::collection::vec(status(), 1..30)) {
        let mut tracker = OrderTracker::new();
        let mut last_severity = 0u8;
        let mut terminal = false;
        for status in updates {
            let mut order = Order::market("BTCUSDT", Side::Buy, Decimal::ONE);
            order.exchange_id = Some("ex-1".to_string());
            order.status = status;
            tracker.apply(&order);

            let current = tracker.status("ex-1").unwrap();
            prop_assert!(current.severity() >= last_severity);
            if terminal {
                prop_assert!(current.is_terminal());
            }
            last_severity = current.severity();
            terminal = current.is_terminal();
        }
    }
}
