//! Strategy executor

use super::dispatch::{order_loop, signal_loop, Dispatch};
use super::hooks::{EventHook, StrategyState};
use crate::error::{Error, Result};
use crate::execution::{ExchangeClient, Order, OrderStatus};
use crate::feed::TickData;
use crate::plugin::{Capability, Plugin, PluginRegistry};
use crate::signal::{Side, Signal, SignalProcessor};
use crate::strategy::{Strategy, StrategyConfig};
use crate::telemetry::{self, CounterMetric, GaugeMetric};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

/// Executor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    /// Capacity of the signal dispatch channel
    #[serde(default = "default_buffer")]
    pub signal_buffer: usize,
    /// Capacity of the order dispatch channel
    #[serde(default = "default_buffer")]
    pub order_buffer: usize,
    /// Upper bound on a single exchange call
    #[serde(default = "default_order_timeout_ms")]
    pub order_timeout_ms: u64,
}

fn default_buffer() -> usize {
    100
}
fn default_order_timeout_ms() -> u64 {
    5000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            signal_buffer: default_buffer(),
            order_buffer: default_buffer(),
            order_timeout_ms: default_order_timeout_ms(),
        }
    }
}

type SharedStrategy = Arc<Mutex<Box<dyn Strategy>>>;

/// Owns live strategies and dispatches their signals and orders
///
/// Must be created inside a Tokio runtime; construction spawns one
/// dispatcher task for signals and one for orders.
pub struct StrategyExecutor {
    strategies: RwLock<HashMap<String, SharedStrategy>>,
    dispatch: Arc<Dispatch>,
    signal_tx: Mutex<Option<mpsc::Sender<Signal>>>,
    order_tx: Mutex<Option<mpsc::Sender<Order>>>,
    dispatchers: Mutex<Vec<JoinHandle<()>>>,
    fill_listener: Mutex<Option<JoinHandle<()>>>,
}

impl StrategyExecutor {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        plugins: Arc<PluginRegistry>,
        config: ExecutorConfig,
    ) -> Self {
        let dispatch = Arc::new(Dispatch {
            hooks: RwLock::new(Vec::new()),
            plugins,
            exchange,
            processor: RwLock::new(None),
            states: RwLock::new(HashMap::new()),
            order_timeout: Duration::from_millis(config.order_timeout_ms),
        });

        let (signal_tx, signal_rx) = mpsc::channel(config.signal_buffer.max(1));
        let (order_tx, order_rx) = mpsc::channel(config.order_buffer.max(1));
        let dispatchers = vec![
            tokio::spawn(signal_loop(Arc::clone(&dispatch), signal_rx)),
            tokio::spawn(order_loop(Arc::clone(&dispatch), order_rx)),
        ];

        Self {
            strategies: RwLock::new(HashMap::new()),
            dispatch,
            signal_tx: Mutex::new(Some(signal_tx)),
            order_tx: Mutex::new(Some(order_tx)),
            dispatchers: Mutex::new(dispatchers),
            fill_listener: Mutex::new(None),
        }
    }

    /// Register a strategy under `id`
    pub async fn add_strategy(
        &self,
        id: impl Into<String>,
        strategy: Box<dyn Strategy>,
    ) -> Result<()> {
        let id = id.into();
        let mut strategies = self.strategies.write().await;
        if strategies.contains_key(&id) {
            return Err(Error::Duplicate(format!("strategy {}", id)));
        }
        tracing::info!(strategy_id = %id, name = strategy.name(), "Strategy added");
        strategies.insert(id, Arc::new(Mutex::new(strategy)));
        telemetry::set_gauge(GaugeMetric::ActiveStrategies, strategies.len() as f64);
        Ok(())
    }

    /// Remove a strategy
    pub async fn remove_strategy(&self, id: &str) -> Result<()> {
        let mut strategies = self.strategies.write().await;
        if strategies.remove(id).is_none() {
            return Err(Error::NotFound(format!("strategy {}", id)));
        }
        telemetry::set_gauge(GaugeMetric::ActiveStrategies, strategies.len() as f64);
        drop(strategies);

        self.dispatch.states.write().await.remove(id);
        tracing::info!(strategy_id = %id, "Strategy removed");
        Ok(())
    }

    /// Registered strategy ids, sorted
    pub async fn list_strategies(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.strategies.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Last lifecycle state reported for a strategy
    pub async fn strategy_state(&self, id: &str) -> StrategyState {
        self.dispatch.state(id).await
    }

    /// Current parameters of a strategy
    pub async fn strategy_params(&self, id: &str) -> Result<StrategyConfig> {
        let strategy = self.get(id).await?;
        let params = strategy.lock().await.params();
        Ok(params)
    }

    async fn get(&self, id: &str) -> Result<SharedStrategy> {
        self.strategies
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("strategy {}", id)))
    }

    async fn snapshot(&self) -> Vec<(String, SharedStrategy)> {
        let mut all: Vec<(String, SharedStrategy)> = self
            .strategies
            .read()
            .await
            .iter()
            .map(|(id, s)| (id.clone(), Arc::clone(s)))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Initialize every strategy with its current parameters
    pub async fn initialize_all(&self) -> Result<()> {
        self.for_each_strategy("initialize", StrategyState::Stopped, |s| {
            let params = s.params();
            s.initialize(&params)
        })
        .await
    }

    /// Start every strategy; failures are combined after all were attempted
    pub async fn start_all(&self) -> Result<()> {
        self.for_each_strategy("start", StrategyState::Running, |s| s.start())
            .await
    }

    /// Stop every strategy; failures are combined after all were attempted
    pub async fn stop_all(&self) -> Result<()> {
        self.for_each_strategy("stop", StrategyState::Stopped, |s| s.stop())
            .await
    }

    async fn for_each_strategy<F>(
        &self,
        action: &str,
        on_success: StrategyState,
        mut op: F,
    ) -> Result<()>
    where
        F: FnMut(&mut dyn Strategy) -> Result<()>,
    {
        let mut errors = Vec::new();
        for (id, strategy) in self.snapshot().await {
            let result = {
                let mut guard = strategy.lock().await;
                op(&mut **guard)
            };
            match result {
                Ok(()) => self.dispatch.set_state(&id, on_success, None).await,
                Err(e) => {
                    tracing::error!(
                        strategy_id = %id,
                        action,
                        error = %e,
                        "Strategy lifecycle call failed"
                    );
                    self.dispatch
                        .set_state(&id, StrategyState::Error, Some(&e))
                        .await;
                    errors.push(e);
                }
            }
        }
        Error::from_many(errors)
    }

    /// Queue a signal for hook fan-out and processing
    ///
    /// Never waits: when the dispatch channel is full the signal is dropped
    /// with a warning.
    pub async fn handle_signal(&self, signal: Signal) -> Result<()> {
        if !self.strategies.read().await.contains_key(&signal.strategy_id) {
            return Err(Error::NotFound(format!("strategy {}", signal.strategy_id)));
        }
        let tx = self.signal_tx.lock().await;
        let Some(tx) = tx.as_ref() else {
            tracing::warn!(signal_id = %signal.id, "Signal dispatcher stopped, dropping signal");
            return Ok(());
        };
        if let Err(e) = tx.try_send(signal) {
            telemetry::increment(CounterMetric::SignalsDropped);
            tracing::warn!(error = %e, "Signal channel full, dropping signal");
        }
        Ok(())
    }

    /// Queue an order for hook fan-out, risk checks and placement
    pub async fn place_order(&self, order: Order) {
        let tx = self.order_tx.lock().await;
        let Some(tx) = tx.as_ref() else {
            tracing::warn!(order_id = %order.id, "Order dispatcher stopped, dropping order");
            return;
        };
        if let Err(e) = tx.try_send(order) {
            tracing::warn!(error = %e, "Order channel full, dropping order");
        }
    }

    /// Replace a strategy's parameters in place, keeping its history
    pub async fn update_strategy_params(&self, id: &str, params: &StrategyConfig) -> Result<()> {
        let strategies = self.strategies.write().await;
        let strategy = strategies
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("strategy {}", id)))?;
        strategy.lock().await.update_params(params)?;
        tracing::info!(strategy_id = %id, kind = params.kind(), "Strategy parameters updated");
        Ok(())
    }

    /// Swap in a new instance under the same id and stop the old one
    pub async fn hot_reload_strategy(&self, id: &str, strategy: Box<dyn Strategy>) -> Result<()> {
        let old = {
            let mut strategies = self.strategies.write().await;
            let slot = strategies
                .get_mut(id)
                .ok_or_else(|| Error::NotFound(format!("strategy {}", id)))?;
            std::mem::replace(slot, Arc::new(Mutex::new(strategy)))
        };

        if let Err(e) = old.lock().await.stop() {
            tracing::warn!(strategy_id = %id, error = %e, "Replaced strategy failed to stop");
        }
        tracing::info!(strategy_id = %id, "Strategy hot-reloaded");
        Ok(())
    }

    /// Close the dispatch channels and wait for both dispatchers to drain
    pub async fn stop_dispatcher(&self) {
        self.signal_tx.lock().await.take();
        self.order_tx.lock().await.take();
        if let Some(listener) = self.fill_listener.lock().await.take() {
            listener.abort();
        }

        let handles: Vec<JoinHandle<()>> = self.dispatchers.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Dispatcher ended abnormally");
            }
        }
    }

    pub async fn register_hook(&self, hook: Arc<dyn EventHook>) {
        self.dispatch.hooks.write().await.push(hook);
    }

    /// Register a risk plugin; it is consulted here and by the processor
    pub async fn register_risk_plugin(&self, plugin: Arc<dyn Plugin>) -> Result<()> {
        self.dispatch
            .plugins
            .register(Capability::Risk, plugin)
            .await
    }

    pub async fn register_metrics_plugin(&self, plugin: Arc<dyn Plugin>) -> Result<()> {
        self.dispatch
            .plugins
            .register(Capability::Metrics, plugin)
            .await
    }

    /// Forward dispatched signals to `processor` and route its fills back
    ///
    /// Orders placed by the processor are reported to hooks; filled ones
    /// are passed to the owning strategy's `on_order_filled`.
    pub async fn attach_processor(self: &Arc<Self>, processor: Arc<SignalProcessor>) {
        let mut placed = processor.subscribe_orders();
        *self.dispatch.processor.write().await = Some(processor);

        let executor = Arc::downgrade(self);
        let listener = tokio::spawn(async move {
            loop {
                let order = match placed.recv().await {
                    Ok(order) => order,
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Fill listener lagged behind processor");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(executor) = executor.upgrade() else {
                    break;
                };
                executor.dispatch.order_placed(&order).await;
                if order.status == OrderStatus::Filled {
                    if let Err(e) = executor.on_order_filled(&order).await {
                        tracing::debug!(order_id = %order.id, error = %e, "Fill not routed");
                    }
                }
            }
        });

        if let Some(previous) = self.fill_listener.lock().await.replace(listener) {
            previous.abort();
        }
    }

    /// Feed a tick to every strategy and dispatch the resulting signals
    ///
    /// A strategy error is logged, counted and reported to hooks; the
    /// strategy stays registered and the other strategies still run.
    pub async fn on_tick(
        &self,
        symbol: &str,
        timestamp: DateTime<Utc>,
        data: &TickData,
    ) -> Vec<Signal> {
        let mut emitted = Vec::new();
        for (id, strategy) in self.snapshot().await {
            let result = strategy.lock().await.on_tick(symbol, timestamp, data);
            match result {
                Ok(signals) => {
                    for signal in signals.into_iter().filter(|s| s.side != Side::Hold) {
                        let signal = signal.with_strategy(id.clone());
                        tracing::debug!(
                            strategy_id = %id,
                            %symbol,
                            side = %signal.side,
                            reason = %signal.reason,
                            "Signal generated"
                        );
                        emitted.push(signal.clone());
                        if let Err(e) = self.handle_signal(signal).await {
                            tracing::warn!(strategy_id = %id, error = %e, "Signal not dispatched");
                        }
                    }
                }
                Err(e) => {
                    telemetry::increment(CounterMetric::StrategyErrors);
                    tracing::warn!(
                        strategy_id = %id,
                        %symbol,
                        error = %e,
                        "Strategy failed to process tick"
                    );
                    let state = self.dispatch.state(&id).await;
                    self.dispatch.status_update(&id, state, Some(&e)).await;
                }
            }
        }
        emitted
    }

    /// Route a fill to the strategy that produced the order
    pub async fn on_order_filled(&self, order: &Order) -> Result<()> {
        let strategy = self.get(&order.strategy_id).await?;
        let result = strategy.lock().await.on_order_filled(order);
        result
    }

    /// Close signals from every strategy, tagged with their strategy id
    pub async fn close_all_positions(&self) -> Result<Vec<Signal>> {
        let mut signals = Vec::new();
        let mut errors = Vec::new();
        for (id, strategy) in self.snapshot().await {
            let result = strategy.lock().await.close_positions();
            match result {
                Ok(closing) => {
                    signals.extend(closing.into_iter().map(|s| s.with_strategy(id.clone())))
                }
                Err(e) => errors.push(e),
            }
        }
        Error::from_many(errors)?;
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::execution::PaperExchange;
    use crate::plugin::{FilterPlugin, RiskPlugin};
    use crate::signal::ProcessorConfig;
    use crate::strategy::{CrossoverParams, DefaultStrategy, VolumeSpikeStrategy};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recorder {
        signals: std::sync::Mutex<Vec<Signal>>,
        orders: std::sync::Mutex<Vec<Order>>,
        statuses: std::sync::Mutex<Vec<(String, StrategyState, Option<String>)>>,
    }

    #[async_trait]
    impl EventHook for Recorder {
        async fn on_signal_received(&self, signal: &Signal) {
            self.signals.lock().unwrap().push(signal.clone());
        }
        async fn on_order_placed(&self, order: &Order) {
            self.orders.lock().unwrap().push(order.clone());
        }
        async fn on_status_update(
            &self,
            strategy_id: &str,
            state: StrategyState,
            error: Option<&Error>,
        ) {
            self.statuses
                .lock()
                .unwrap()
                .push((strategy_id.to_string(), state, error.map(|e| e.to_string())));
        }
    }

    struct PanickingHook;

    #[async_trait]
    impl EventHook for PanickingHook {
        async fn on_signal_received(&self, _signal: &Signal) {
            panic!("hook bug");
        }
        async fn on_order_placed(&self, _order: &Order) {
            panic!("hook bug");
        }
        async fn on_status_update(
            &self,
            _id: &str,
            _state: StrategyState,
            _error: Option<&Error>,
        ) {}
    }

    /// Strategy whose lifecycle calls can be made to fail
    struct Scripted {
        fail_start: bool,
        stops: Arc<AtomicUsize>,
    }

    impl Strategy for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }
        fn initialize(&mut self, _config: &StrategyConfig) -> Result<()> {
            Ok(())
        }
        fn params(&self) -> StrategyConfig {
            StrategyConfig::Default(CrossoverParams::default())
        }
        fn update_params(&mut self, _config: &StrategyConfig) -> Result<()> {
            Ok(())
        }
        fn on_tick(
            &mut self,
            symbol: &str,
            timestamp: DateTime<Utc>,
            data: &TickData,
        ) -> Result<Vec<Signal>> {
            if data.price() <= Decimal::ZERO {
                return Err(Error::InvalidArg("bad tick".into()));
            }
            Ok(vec![
                Signal::new(symbol, Side::Buy, data.price(), timestamp, "scripted"),
                Signal::new(symbol, Side::Hold, data.price(), timestamp, "noop"),
            ])
        }
        fn on_order_filled(&mut self, _order: &Order) -> Result<()> {
            Ok(())
        }
        fn close_positions(&mut self) -> Result<Vec<Signal>> {
            Ok(Vec::new())
        }
        fn has_position(&self, _symbol: &str) -> bool {
            false
        }
        fn start(&mut self) -> Result<()> {
            if self.fail_start {
                return Err(Error::Exchange("start error".into()));
            }
            Ok(())
        }
        fn stop(&mut self) -> Result<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn scripted(fail_start: bool) -> (Box<dyn Strategy>, Arc<AtomicUsize>) {
        let stops = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Scripted {
                fail_start,
                stops: stops.clone(),
            }),
            stops,
        )
    }

    struct VetoAll;

    impl RiskPlugin for VetoAll {
        fn before_order(&self, _order: &Order) -> Result<()> {
            Err(Error::RiskRejected("blocked".into()))
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

    fn executor() -> (StrategyExecutor, Arc<PaperExchange>) {
        let exchange = Arc::new(PaperExchange::new(dec!(0)));
        let executor = StrategyExecutor::new(
            exchange.clone(),
            Arc::new(PluginRegistry::new()),
            ExecutorConfig::default(),
        );
        (executor, exchange)
    }

    #[tokio::test]
    async fn test_add_and_remove() {
        let (executor, _) = executor();
        executor
            .add_strategy("s1", Box::new(DefaultStrategy::new()))
            .await
            .unwrap();
        let err = executor
            .add_strategy("s1", Box::new(DefaultStrategy::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);

        executor.remove_strategy("s1").await.unwrap();
        let err = executor.remove_strategy("s1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_lifecycle_collects_errors() {
        let (executor, _) = executor();
        let hook = Arc::new(Recorder::default());
        executor.register_hook(hook.clone()).await;

        let (ok, ok_stops) = scripted(false);
        let (bad, bad_stops) = scripted(true);
        executor.add_strategy("s1", ok).await.unwrap();
        executor.add_strategy("s2", bad).await.unwrap();

        executor.initialize_all().await.unwrap();
        let err = executor.start_all().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Exchange);
        assert_eq!(executor.strategy_state("s1").await, StrategyState::Running);
        assert_eq!(executor.strategy_state("s2").await, StrategyState::Error);

        executor.stop_all().await.unwrap();
        assert_eq!(ok_stops.load(Ordering::SeqCst), 1);
        assert_eq!(bad_stops.load(Ordering::SeqCst), 1);

        let statuses = hook.statuses.lock().unwrap().clone();
        assert!(statuses
            .iter()
            .any(|(id, state, err)| id == "s2" && *state == StrategyState::Error && err.is_some()));
    }

    #[tokio::test]
    async fn test_handle_signal_fans_out_once_per_hook() {
        let (executor, _) = executor();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        executor.register_hook(Arc::new(PanickingHook)).await;
        executor.register_hook(first.clone()).await;
        executor.register_hook(second.clone()).await;
        executor
            .add_strategy("s1", Box::new(DefaultStrategy::new()))
            .await
            .unwrap();

        let signal = Signal::new("BTCUSDT", Side::Buy, dec!(1), Utc::now(), "manual")
            .with_strategy("s1");
        executor.handle_signal(signal.clone()).await.unwrap();
        executor.stop_dispatcher().await;

        assert_eq!(*first.signals.lock().unwrap(), vec![signal.clone()]);
        assert_eq!(*second.signals.lock().unwrap(), vec![signal]);
    }

    #[tokio::test]
    async fn test_handle_signal_unknown_strategy() {
        let (executor, _) = executor();
        let signal = Signal::new("BTCUSDT", Side::Buy, dec!(1), Utc::now(), "x")
            .with_strategy("ghost");
        let err = executor.handle_signal(signal).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_risk_veto_blocks_placement() {
        let (executor, exchange) = executor();
        let hook = Arc::new(Recorder::default());
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

    struct PanicOnSymbol;

    impl RiskPlugin for PanicOnSymbol {
        fn before_order(&self, order: &Order) -> Result<()> {
            if order.symbol == "PANICUSDT" {
                panic!("risk engine bug");
            }
            Ok(())
        }
    }

    impl Plugin for PanicOnSymbol {
        fn name(&self) -> &str {
            "panic_on_symbol"
        }
        fn as_risk(&self) -> Option<&dyn RiskPlugin> {
            Some(self)
        }
    }

    #[tokio::test]
    async fn test_order_dispatcher_survives_risk_panic() {
        let (executor, exchange) = executor();
        exchange.set_price("BTCUSDT", dec!(10)).await;
        executor
            .register_risk_plugin(Arc::new(PanicOnSymbol))
            .await
            .unwrap();

        executor
            .place_order(Order::market("PANICUSDT", Side::Buy, dec!(1)))
            .await;
        executor
            .place_order(Order::market("BTCUSDT", Side::Buy, dec!(1)))
            .await;
        executor.stop_dispatcher().await;

        let placed = exchange.placed_orders().await;
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].symbol, "BTCUSDT");
    }

    #[tokio::test]
    async fn test_failed_placement_reports_status() {
        let (executor, exchange) = executor();
        let hook = Arc::new(Recorder::default());
        executor.register_hook(hook.clone()).await;

        // no ticker set, so the market order cannot be priced
        let order = Order::market("BTCUSDT", Side::Buy, dec!(1)).with_strategy("s1");
        executor.place_order(order).await;
        executor.stop_dispatcher().await;

        assert_eq!(exchange.place_calls(), 1);
        let statuses = hook.statuses.lock().unwrap().clone();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].0, "s1");
        assert!(statuses[0].2.is_some());
    }

    #[tokio::test]
    async fn test_stop_dispatcher_idempotent() {
        let (executor, exchange) = executor();
        executor.stop_dispatcher().await;
        executor.stop_dispatcher().await;
        executor
            .place_order(Order::market("BTCUSDT", Side::Buy, dec!(1)))
            .await;
        assert_eq!(exchange.place_calls(), 0);
    }

    #[tokio::test]
    async fn test_update_params_and_hot_reload() {
        let (executor, _) = executor();
        let (old, old_stops) = scripted(false);
        executor.add_strategy("s1", old).await.unwrap();

        executor
            .hot_reload_strategy("s1", Box::new(DefaultStrategy::new()))
            .await
            .unwrap();
        assert_eq!(old_stops.load(Ordering::SeqCst), 1);

        let params = StrategyConfig::Default(CrossoverParams {
            short_period: 5,
            long_period: 20,
        });
        executor
            .update_strategy_params("s1", &params)
            .await
            .unwrap();
        assert_eq!(executor.strategy_params("s1").await.unwrap(), params);

        let wrong = StrategyConfig::default_for("breakout").unwrap();
        assert!(executor.update_strategy_params("s1", &wrong).await.is_err());
        assert!(executor
            .hot_reload_strategy("nope", Box::new(DefaultStrategy::new()))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_on_tick_tags_and_filters_signals() {
        let (executor, _) = executor();
        let hook = Arc::new(Recorder::default());
        executor.register_hook(hook.clone()).await;
        let (strategy, _) = scripted(false);
        executor.add_strategy("scripted", strategy).await.unwrap();
        executor
            .add_strategy("spike", Box::new(VolumeSpikeStrategy::new()))
            .await
            .unwrap();

        let signals = executor
            .on_tick("BTCUSDT", Utc::now(), &TickData::ticker(dec!(10), dec!(1)))
            .await;
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].strategy_id, "scripted");
        assert_eq!(signals[0].side, Side::Buy);

        let none = executor
            .on_tick("BTCUSDT", Utc::now(), &TickData::ticker(dec!(0), dec!(1)))
            .await;
        assert!(none.is_empty());
        assert_eq!(executor.list_strategies().await, vec!["scripted", "spike"]);

        executor.stop_dispatcher().await;
        assert_eq!(hook.signals.lock().unwrap().len(), 1);
        let statuses = hook.statuses.lock().unwrap().clone();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].2.as_deref(), Some("Invalid argument: bad tick"));
    }

    #[tokio::test]
    async fn test_processor_fills_reach_strategy() {
        let exchange = Arc::new(PaperExchange::new(dec!(0)));
        exchange.set_price("BTCUSDT", dec!(10)).await;
        let plugins = Arc::new(PluginRegistry::new());
        let executor = Arc::new(StrategyExecutor::new(
            exchange.clone(),
            plugins.clone(),
            ExecutorConfig::default(),
        ));
        let processor = Arc::new(SignalProcessor::new(
            exchange.clone(),
            plugins,
            ProcessorConfig::default(),
        ));
        processor.start().await;
        executor.attach_processor(processor.clone()).await;

        executor
            .add_strategy("crossover", Box::new(DefaultStrategy::new()))
            .await
            .unwrap();
        let signal = Signal::new("BTCUSDT", Side::Buy, dec!(0), Utc::now(), "manual")
            .with_strategy("crossover");
        executor.handle_signal(signal).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let filled = executor
                    .strategies
                    .read()
                    .await
                    .get("crossover")
                    .unwrap()
                    .lock()
                    .await
                    .has_position("BTCUSDT");
                if filled {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("fill was not routed back");

        let closing = executor.close_all_positions().await.unwrap();
        assert_eq!(closing.len(), 1);
        assert_eq!(closing[0].strategy_id, "crossover");

        processor.stop().await;
        executor.stop_dispatcher().await;
    }

    struct BrokenFilter;

    impl FilterPlugin for BrokenFilter {
        fn validate(&self, signal: &Signal) -> bool {
            if signal.symbol == "PANICUSDT" {
                panic!("filter bug");
            }
            true
        }
    }

    impl Plugin for BrokenFilter {
        fn name(&self) -> &str {
            "broken_filter"
        }
        fn as_filter(&self) -> Option<&dyn FilterPlugin> {
            Some(self)
        }
    }

    #[tokio::test]
    async fn test_dispatcher_survives_filter_panic() {
        let exchange = Arc::new(PaperExchange::new(dec!(0)));
        exchange.set_price("BTCUSDT", dec!(10)).await;
        let plugins = Arc::new(PluginRegistry::new());
        let executor = Arc::new(StrategyExecutor::new(
            exchange.clone(),
            plugins.clone(),
            ExecutorConfig::default(),
        ));
        let processor = Arc::new(SignalProcessor::new(
            exchange.clone(),
            plugins,
            ProcessorConfig::default(),
        ));
        processor
            .register_filter_plugin(Arc::new(BrokenFilter))
            .await
            .unwrap();
        processor.start().await;
        executor.attach_processor(processor.clone()).await;
        executor
            .add_strategy("s1", Box::new(DefaultStrategy::new()))
            .await
            .unwrap();

        for symbol in ["PANICUSDT", "BTCUSDT"] {
            let signal = Signal::new(symbol, Side::Buy, dec!(0), Utc::now(), "manual")
                .with_strategy("s1");
            executor.handle_signal(signal).await.unwrap();
        }

        tokio::time::timeout(Duration::from_secs(5), async {
            while exchange.place_calls() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("signal after the panic was not placed");

        let placed = exchange.placed_orders().await;
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].symbol, "BTCUSDT");
        assert_eq!(processor.stats().panicked, 1);

        processor.stop().await;
        executor.stop_dispatcher().await;
    }
}
