//! Detector, auto-buy and sniper loops against the paper exchange

use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use strategy_core::autobuy::{
    AutoBuyConfig, AutoBuyRule, AutoBuyService, InMemoryAutoBuyRepository, TriggerType,
};
use strategy_core::error::ErrorKind;
use strategy_core::execution::{OrderStatus, PaperExchange};
use strategy_core::market::{
    CoinEvent, CoinRepository, CoinStatus, DetectorConfig, EventBus, InMemoryCoinRepository,
    Listing, NewCoinDetector,
};
use strategy_core::risk::RiskLimits;
use strategy_core::signal::Side;
use strategy_core::sniper::{Comparison, SnipeRequest, SniperController, SniperShotUseCase};
use strategy_core::wallet::{InMemoryWalletRepository, Wallet, WalletRepository};
use tokio::sync::mpsc;

#[tokio::test]
async fn test_detector_loop_publishes_lifecycle() {
    let exchange = Arc::new(PaperExchange::new(dec!(0)));
    exchange
        .set_listings(vec![Listing::new("ABCUSDT", CoinStatus::PreTrading)])
        .await;

    let coins = Arc::new(InMemoryCoinRepository::new());
    let bus = Arc::new(EventBus::new());
    let (tx, mut rx) = mpsc::unbounded_channel::<CoinEvent>();
    bus.subscribe(Arc::new(move |event: &CoinEvent| {
        let _ = tx.send(event.clone());
    }))
    .await;

    let detector = Arc::new(NewCoinDetector::new(
        exchange.clone(),
        coins.clone(),
        bus,
        DetectorConfig {
            poll_interval_secs: 1,
        },
    ));
    let handle = {
        let detector = detector.clone();
        tokio::spawn(async move { detector.run().await })
    };

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.event_type(), "new_coin_detected");
    assert_eq!(first.coin.status, CoinStatus::PreTrading);

    exchange
        .set_listings(vec![Listing::new("ABCUSDT", CoinStatus::Trading)])
        .await;
    let second = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(second.became_tradable());
    assert_eq!(second.coin.id, first.coin.id);

    detector.stop();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    let stored = coins.get_by_symbol("ABCUSDT").await.unwrap().unwrap();
    assert_eq!(stored.status, CoinStatus::Trading);
    assert!(stored.became_tradable_at.is_some());
}

#[tokio::test]
async fn test_restarted_detector_remembers_coins() {
    let exchange = Arc::new(PaperExchange::new(dec!(0)));
    exchange
        .set_listings(vec![Listing::new("ABCUSDT", CoinStatus::Trading)])
        .await;
    let coins = Arc::new(InMemoryCoinRepository::new());

    let first = NewCoinDetector::new(
        exchange.clone(),
        coins.clone(),
        Arc::new(EventBus::new()),
        DetectorConfig::default(),
    );
    assert_eq!(first.detect_once().await.unwrap().len(), 1);

    let second = NewCoinDetector::new(
        exchange.clone(),
        coins.clone(),
        Arc::new(EventBus::new()),
        DetectorConfig::default(),
    );
    assert!(second.detect_once().await.unwrap().is_empty());
}

async fn autobuy(evaluation_interval_secs: u64) -> (Arc<AutoBuyService>, Arc<PaperExchange>) {
    let exchange = Arc::new(PaperExchange::new(dec!(0)));
    exchange
        .set_listings(vec![Listing::new("DOGEUSDT", CoinStatus::Trading)])
        .await;
    exchange.set_price("DOGEUSDT", dec!(0.12)).await;

    let wallets = Arc::new(InMemoryWalletRepository::new());
    wallets
        .save(&Wallet::new("alice").with_balance("USDT", dec!(500)))
        .await
        .unwrap();

    let service = Arc::new(AutoBuyService::new(
        exchange.clone(),
        wallets,
        Arc::new(InMemoryAutoBuyRepository::new()),
        &RiskLimits::default(),
        AutoBuyConfig {
            evaluation_interval_secs,
        },
    ));
    (service, exchange)
}

#[tokio::test]
async fn test_autobuy_loop_respects_cooldown() {
    let (service, exchange) = autobuy(1).await;
    let rule = service
        .create_rule(
            AutoBuyRule::new(
                "alice",
                "DOGEUSDT",
                TriggerType::PriceBelow,
                dec!(0.10),
                dec!(50),
            )
            .with_cooldown(60),
        )
        .await
        .unwrap();

    let handle = {
        let service = service.clone();
        tokio::spawn(async move { service.run().await })
    };

    // not triggered at 0.12
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(exchange.place_calls(), 0);

    exchange.set_price("DOGEUSDT", dec!(0.08)).await;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while exchange.place_calls() == 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(exchange.place_calls(), 1);

    // another pass inside the cooldown window
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(exchange.place_calls(), 1);

    service.stop();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    let stored = service.get_rule(rule.id).await.unwrap();
    assert_eq!(stored.execution_count, 1);
    assert_eq!(stored.last_price, dec!(0.08));

    let executions = service.executions(rule.id).await.unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].quantity, dec!(625));
    assert_eq!(executions[0].amount, dec!(50));

    let placed = exchange.placed_orders().await;
    assert_eq!(placed[0].side, Side::Buy);
    assert_eq!(placed[0].strategy_id, "autobuy");
}

#[tokio::test]
async fn test_autobuy_unknown_symbol_rejected() {
    let (service, _exchange) = autobuy(10).await;
    let err = service
        .create_rule(AutoBuyRule::new(
            "alice",
            "NOPEUSDT",
            TriggerType::PriceAbove,
            dec!(1),
            dec!(10),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(service.list_rules("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_autobuy_underfunded_rule_skipped() {
    let (service, exchange) = autobuy(10).await;
    service
        .create_rule(AutoBuyRule::new(
            "alice",
            "DOGEUSDT",
            TriggerType::PriceAbove,
            dec!(0.1),
            dec!(5000),
        ))
        .await
        .unwrap();

    let placed = service.evaluate_rules().await.unwrap();
    assert!(placed.is_empty());
    assert_eq!(exchange.place_calls(), 0);
}

#[tokio::test]
async fn test_shot_with_trigger_and_wallet() {
    let exchange = Arc::new(PaperExchange::new(dec!(0)));
    exchange.set_price("PEPEUSDT", dec!(0.002)).await;
    let wallets = Arc::new(InMemoryWalletRepository::new());
    wallets
        .save(&Wallet::new("bob").with_balance("USDT", dec!(100)))
        .await
        .unwrap();
    let shot = SniperShotUseCase::new(exchange.clone(), wallets)
        .with_poll_interval(Duration::from_millis(5));

    let feeder = {
        let exchange = exchange.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            exchange.set_price("PEPEUSDT", dec!(0.0035)).await;
        })
    };
    let request = SnipeRequest::market("bob", "PEPEUSDT", Side::Buy, dec!(10000))
        .with_trigger(dec!(0.003), Comparison::Above)
        .with_time_limit(Duration::from_secs(5));
    let result = shot.execute(request).await.unwrap();
    feeder.await.unwrap();

    assert!(result.success);
    let order = result.order.unwrap();
    assert_eq!(order.status, OrderStatus::Filled);
    assert_eq!(order.avg_fill_price, dec!(0.0035));
}

#[tokio::test]
async fn test_controller_without_service() {
    let controller = SniperController::new(None, Arc::new(InMemoryCoinRepository::new())).await;

    let err = controller.execute_snipe("XYZUSDT").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SniperNotInitialized);
    let err = controller.setup_auto_snipe(true, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SniperNotInitialized);
    assert!(!controller.auto_snipe_enabled().await);
}
