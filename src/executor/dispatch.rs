//! Dispatcher tasks for signals and orders

use super::hooks::{EventHook, StrategyState};
use crate::error::{Error, Result};
use crate::execution::{ExchangeClient, Order};
use crate::plugin::PluginRegistry;
use crate::signal::{Signal, SignalProcessor};
use crate::telemetry::{self, CounterMetric, LatencyMetric};
use futures_util::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};

/// State shared between the executor handle and its dispatcher tasks
pub(super) struct Dispatch {
    pub hooks: RwLock<Vec<Arc<dyn EventHook>>>,
    pub plugins: Arc<PluginRegistry>,
    pub exchange: Arc<dyn ExchangeClient>,
    pub processor: RwLock<Option<Arc<SignalProcessor>>>,
    pub states: RwLock<HashMap<String, StrategyState>>,
    pub order_timeout: Duration,
}

impl Dispatch {
    async fn hooks(&self) -> Vec<Arc<dyn EventHook>> {
        self.hooks.read().await.clone()
    }

    pub async fn state(&self, strategy_id: &str) -> StrategyState {
        self.states
            .read()
            .await
            .get(strategy_id)
            .copied()
            .unwrap_or_default()
    }

    /// Record a lifecycle state and notify hooks
    pub async fn set_state(&self, strategy_id: &str, state: StrategyState, error: Option<&Error>) {
        self.states
            .write()
            .await
            .insert(strategy_id.to_string(), state);
        self.status_update(strategy_id, state, error).await;
    }

    /// Call every hook's `on_signal_received` and every metrics plugin
    pub async fn signal_received(&self, signal: &Signal) {
        for (i, hook) in self.hooks().await.into_iter().enumerate() {
            if AssertUnwindSafe(hook.on_signal_received(signal))
                .catch_unwind()
                .await
                .is_err()
            {
                tracing::error!(
                    hook = i,
                    signal_id = %signal.id,
                    "Hook panicked in on_signal_received"
                );
            }
        }
        let data = serde_json::to_value(signal).unwrap_or(Value::Null);
        self.plugins.record_event("signal_received", &data).await;
    }

    /// Call every hook's `on_order_placed` and every metrics plugin
    pub async fn order_placed(&self, order: &Order) {
        for (i, hook) in self.hooks().await.into_iter().enumerate() {
            if AssertUnwindSafe(hook.on_order_placed(order))
                .catch_unwind()
                .await
                .is_err()
            {
                tracing::error!(hook = i, order_id = %order.id, "Hook panicked in on_order_placed");
            }
        }
        let data = serde_json::to_value(order).unwrap_or(Value::Null);
        self.plugins.record_event("order_placed", &data).await;
    }

    /// Call every hook's `on_status_update` and every metrics plugin
    pub async fn status_update(
        &self,
        strategy_id: &str,
        state: StrategyState,
        error: Option<&Error>,
    ) {
        for (i, hook) in self.hooks().await.into_iter().enumerate() {
            if AssertUnwindSafe(hook.on_status_update(strategy_id, state, error))
                .catch_unwind()
                .await
                .is_err()
            {
                tracing::error!(hook = i, %strategy_id, "Hook panicked in on_status_update");
            }
        }
        let data = serde_json::json!({
            "strategy_id": strategy_id,
            "status": state.as_str(),
            "error": error.map(|e| e.to_string()),
        });
        self.plugins.record_event("status_update", &data).await;
    }

    /// Risk-check and place an order on the exchange
    async fn place(&self, order: &Order) -> Result<Order> {
        if let Err(e) = self.plugins.check_risk(order).await {
            telemetry::increment(CounterMetric::OrdersRejected);
            return Err(e);
        }

        let started = Instant::now();
        let result = tokio::time::timeout(self.order_timeout, self.exchange.place_order(order))
            .await
            .map_err(|_| Error::Timeout(self.order_timeout.as_millis() as u64))
            .and_then(|r| r);
        telemetry::record_latency(LatencyMetric::OrderSubmission, started.elapsed());
        result
    }
}

/// Fan out each signal to hooks, then forward it to the attached processor
pub(super) async fn signal_loop(dispatch: Arc<Dispatch>, mut rx: mpsc::Receiver<Signal>) {
    while let Some(signal) = rx.recv().await {
        dispatch.signal_received(&signal).await;

        let processor = dispatch.processor.read().await.clone();
        if let Some(processor) = processor {
            // drops are counted and logged by the processor
            let _ = processor.submit(signal).await;
        }
    }
    tracing::debug!("Signal dispatcher drained");
}

/// Fan out each order to hooks, then risk-check and place it
///
/// A panic while placing drops that order and leaves the loop running.
pub(super) async fn order_loop(dispatch: Arc<Dispatch>, mut rx: mpsc::Receiver<Order>) {
    while let Some(order) = rx.recv().await {
        dispatch.order_placed(&order).await;

        let outcome = AssertUnwindSafe(dispatch.place(&order))
            .catch_unwind()
            .await;
        let Ok(result) = outcome else {
            telemetry::increment(CounterMetric::OrdersFailed);
            tracing::error!(
                order_id = %order.id,
                strategy_id = %order.strategy_id,
                "Panic while placing order, dropping it"
            );
            continue;
        };
        match result {
            Ok(placed) => {
                telemetry::increment(CounterMetric::OrdersPlaced);
                tracing::info!(
                    order_id = %placed.id,
                    strategy_id = %placed.strategy_id,
                    symbol = %placed.symbol,
                    status = %placed.status,
                    "Order placed"
                );
            }
            Err(e @ Error::RiskRejected(_)) => {
                tracing::warn!(
                    order_id = %order.id,
                    strategy_id = %order.strategy_id,
                    error = %e,
                    "Order blocked by risk plugin"
                );
            }
            Err(e) => {
                telemetry::increment(CounterMetric::OrdersFailed);
                tracing::warn!(
                    order_id = %order.id,
                    strategy_id = %order.strategy_id,
                    error = %e,
                    "Order placement failed"
                );
                let state = dispatch.state(&order.strategy_id).await;
                dispatch
                    .status_update(&order.strategy_id, state, Some(&e))
                    .await;
            }
        }
    }
    tracing::debug!("Order dispatcher drained");
}
