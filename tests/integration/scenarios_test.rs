//! End-to-end scenarios across strategies, processor, executor and sniper

use crate::common::{eventually, replay, start_time, ticks};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strategy_core::error::{Error, ErrorKind, Result};
use strategy_core::execution::{Order, PaperExchange};
use strategy_core::executor::{EventHook, ExecutorConfig, StrategyExecutor, StrategyState};
use strategy_core::market::{
    CoinStatus, DetectorConfig, EventBus, InMemoryCoinRepository, Listing, NewCoinDetector,
};
use strategy_core::plugin::{Plugin, PluginRegistry, RiskPlugin};
use strategy_core::signal::{ProcessorConfig, Side, Signal, SignalProcessor};
use strategy_core::sniper::{ExchangeSniperService, SniperConfig, SniperController, SniperService};
use strategy_core::strategy::{BreakoutStrategy, StrategyConfig, StrategyRegistry};

#[tokio::test]
async fn test_ma_crossover_buy() {
    let registry = StrategyRegistry::with_defaults().await;
    let mut strategy = registry.create("default").await.unwrap();

    let mut series: Vec<(Decimal, Decimal)> =
        (100..130).map(|p| (Decimal::from(p), dec!(1))).collect();
    series.extend([(dec!(135), dec!(1)); 5]);
    let signals = replay(strategy.as_mut(), &ticks("BTCUSDT", &series));

    assert_eq!(signals.len(), 1);
    let (tick, signal) = &signals[0];
    assert_eq!(*tick, 31);
    assert_eq!(signal.side, Side::Buy);
    assert_eq!(signal.symbol, "BTCUSDT");
    assert_eq!(signal.reason, "MA Crossover (Bullish)");
}

#[tokio::test]
async fn test_volume_spike_detection() {
    let registry = StrategyRegistry::with_defaults().await;
    let params = StrategyConfig::parse(
        "volumespike",
        json!({ "volume_threshold_percent": 200.0, "lookback_period": 5, "min_volume": 100.0 }),
    )
    .unwrap();
    registry.save_config("volumespike", params).await.unwrap();
    let mut strategy = registry.create("volumespike").await.unwrap();

    let series: Vec<(Decimal, Decimal)> = [100, 100, 100, 100, 100, 400]
        .iter()
        .map(|v| (dec!(50), Decimal::from(*v)))
        .collect();
    let signals = replay(strategy.as_mut(), &ticks("NEWUSDT", &series));

    assert_eq!(signals.len(), 1);
    let (tick, signal) = &signals[0];
    assert_eq!(*tick, 6);
    assert_eq!(signal.side, Side::Buy);
    assert!(signal.reason.contains("200.00% increase"));
}

#[test]
fn test_breakout_confirmation() {
    let mut strategy = BreakoutStrategy::new();
    let mut series: Vec<(Decimal, Decimal)> = (0..20)
        .map(|i| {
            let price = if i % 2 == 0 { dec!(100) } else { dec!(110) };
            (price, dec!(10000))
        })
        .collect();
    series.extend([(dec!(112), dec!(10000)); 3]);

    let signals = replay(&mut strategy, &ticks("BTCUSDT", &series));
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].0, 22);
    assert_eq!(signals[0].1.side, Side::Buy);
}

struct VetoAll;

impl RiskPlugin for VetoAll {
    fn before_order(&self, _order: &Order) -> Result<()> {
        Err(Error::RiskRejected("trading halted".into()))
    }
}

impl Plugin for VetoAll {
    fn name(&self) -> &str {
        "veto_all"
    }

    fn as_risk(&self) -> Option<&dyn RiskPlugin> {
        Some(self)
    }
}

#[derive(Default)]
struct OrderRecorder {
    orders: Mutex<Vec<Order>>,
}

#[async_trait]
impl EventHook for OrderRecorder {
    async fn on_signal_received(&self, _signal: &Signal) {}

    async fn on_order_placed(&self, order: &Order) {
        self.orders.lock().unwrap().push(order.clone());
    }

    async fn on_status_update(
        &self,
        _strategy_id: &str,
        _state: StrategyState,
        _error: Option<&Error>,
    ) {}
}

#[tokio::test]
async fn test_risk_plugin_veto() {
    let exchange = Arc::new(PaperExchange::new(dec!(0)));
    exchange.set_price("BTCUSDT", dec!(100)).await;
    let executor = StrategyExecutor::new(
        exchange.clone(),
        Arc::new(PluginRegistry::new()),
        ExecutorConfig::default(),
    );
    let hook = Arc::new(OrderRecorder::default());
    executor.register_hook(hook.clone()).await;
    executor
        .register_risk_plugin(Arc::new(VetoAll))
        .await
        .unwrap();

    executor
        .place_order(Order::market("BTCUSDT", Side::Buy, dec!(1)))
        .await;
    executor.stop_dispatcher().await;

    assert_eq!(exchange.place_calls(), 0);
    assert_eq!(hook.orders.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_queue_full_drop() {
    let exchange = Arc::new(PaperExchange::new(dec!(0)));
    exchange.set_price("BTCUSDT", dec!(100)).await;
    let processor = SignalProcessor::new(
        exchange.clone(),
        Arc::new(PluginRegistry::new()),
        ProcessorConfig {
            queue_capacity: 2,
            ..ProcessorConfig::default()
        },
    );
    processor.pause();
    processor.start().await;

    let mut outcomes = Vec::new();
    for i in 0..5 {
        let signal = Signal::new(
            "BTCUSDT",
            Side::Buy,
            dec!(0),
            start_time(),
            format!("signal {}", i),
        );
        outcomes.push(processor.submit(signal).await);
    }
    let accepted = outcomes.iter().filter(|o| o.is_ok()).count();
    let dropped: Vec<_> = outcomes.iter().filter_map(|o| o.as_ref().err()).collect();
    assert_eq!(accepted, 2);
    assert_eq!(dropped.len(), 3);
    assert!(dropped.iter().all(|e| e.kind() == ErrorKind::QueueFull));

    processor.resume();
    let watched = exchange.clone();
    assert!(
        eventually(move || {
            let exchange = watched.clone();
            async move { exchange.place_calls() >= 2 }
        })
        .await
    );
    processor.stop().await;
    assert_eq!(exchange.placed_orders().await.len(), 2);
}

#[tokio::test]
async fn test_sniper_on_tradable() {
    let exchange = Arc::new(PaperExchange::new(dec!(0)));
    exchange
        .set_listings(vec![Listing::new("XYZUSDT", CoinStatus::PreTrading)])
        .await;

    let coins = Arc::new(InMemoryCoinRepository::new());
    let bus = Arc::new(EventBus::default());
    let detector = NewCoinDetector::new(
        exchange.clone(),
        coins.clone(),
        bus.clone(),
        DetectorConfig::default(),
    );

    let service: Arc<dyn SniperService> =
        Arc::new(ExchangeSniperService::new(exchange.clone(), SniperConfig::default()));
    let controller = Arc::new(SniperController::new(Some(service), coins.clone()).await);
    controller
        .setup_auto_snipe(
            true,
            Some(SniperConfig {
                max_buy_amount: dec!(100),
                max_price_per_token: dec!(10),
                ..SniperConfig::default()
            }),
        )
        .await
        .unwrap();
    controller.subscribe(&bus).await;

    // first sighting is not a tradable transition
    detector.detect_once().await.unwrap();
    assert_eq!(exchange.place_calls(), 0);

    exchange.set_price("XYZUSDT", dec!(0.25)).await;
    exchange
        .set_listings(vec![Listing::new("XYZUSDT", CoinStatus::Trading)])
        .await;
    let events = detector.detect_once().await.unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].became_tradable());

    let placed = tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            let orders = exchange.placed_orders().await;
            if !orders.is_empty() {
                return orders;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(exchange.placed_orders().await.len(), 1);
    let order = &placed[0];
    assert_eq!(order.side, Side::Buy);
    assert_eq!(order.symbol, "XYZUSDT");
    assert!(order.quantity * dec!(0.25) <= dec!(100));
}
