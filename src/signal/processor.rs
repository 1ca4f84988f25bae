//! Signal processor
//!
//! Turns accepted signals into orders on a single background worker:
//! filter chain and priority at admission, then order construction,
//! routing plugins, risk plugins and finally the exchange client.
//! Every failure drops the signal with a log line; nothing is retried.

use super::queue::PriorityQueue;
use super::{Side, Signal};
use crate::error::{Error, Result};
use crate::execution::{ExchangeClient, Order};
use crate::plugin::{Capability, FilterOutcome, Plugin, PluginRegistry};
use crate::telemetry::{self, CounterMetric, GaugeMetric, LatencyMetric};
use futures_util::FutureExt;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch, Mutex, Notify};
use tokio::task::JoinHandle;

/// Signal processor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    /// Maximum queued signals before submissions are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Upper bound on a single exchange call
    #[serde(default = "default_order_timeout_ms")]
    pub order_timeout_ms: u64,
}

fn default_queue_capacity() -> usize {
    1000
}
fn default_order_timeout_ms() -> u64 {
    5000
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            order_timeout_ms: default_order_timeout_ms(),
        }
    }
}

/// What happened to a submitted signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Queued for processing with the given priority
    Queued { priority: i32 },
    /// Rejected by a filter plugin
    Filtered,
}

/// Processor counters
#[derive(Debug, Default)]
pub struct ProcessorStats {
    pub submitted: AtomicU64,
    pub filtered: AtomicU64,
    pub dropped: AtomicU64,
    pub processed: AtomicU64,
    pub placed: AtomicU64,
    pub failed: AtomicU64,
    /// Signals dropped because a plugin panicked
    pub panicked: AtomicU64,
}

/// Point-in-time copy of [`ProcessorStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub filtered: u64,
    pub dropped: u64,
    pub processed: u64,
    pub placed: u64,
    pub failed: u64,
    pub panicked: u64,
}

impl ProcessorStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            placed: self.placed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
        }
    }
}

struct Shared {
    exchange: Arc<dyn ExchangeClient>,
    plugins: Arc<PluginRegistry>,
    queue: Mutex<PriorityQueue<Signal>>,
    notify: Notify,
    paused: watch::Sender<bool>,
    shutdown: watch::Sender<bool>,
    placed_tx: broadcast::Sender<Order>,
    order_timeout: Duration,
    stats: ProcessorStats,
}

/// Asynchronous signal-to-order pipeline with a bounded priority queue
pub struct SignalProcessor {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SignalProcessor {
    /// Create a processor that shares `plugins` with the executor
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        plugins: Arc<PluginRegistry>,
        config: ProcessorConfig,
    ) -> Self {
        let (paused, _) = watch::channel(false);
        let (shutdown, _) = watch::channel(false);
        let (placed_tx, _) = broadcast::channel(256);
        Self {
            shared: Arc::new(Shared {
                exchange,
                plugins,
                queue: Mutex::new(PriorityQueue::new(config.queue_capacity)),
                notify: Notify::new(),
                paused,
                shutdown,
                placed_tx,
                order_timeout: Duration::from_millis(config.order_timeout_ms),
                stats: ProcessorStats::default(),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Register a filter plugin
    pub async fn register_filter_plugin(&self, plugin: Arc<dyn Plugin>) -> Result<()> {
        self.shared
            .plugins
            .register(Capability::Filter, plugin)
            .await
    }

    /// Register an order routing plugin
    pub async fn register_routing_plugin(&self, plugin: Arc<dyn Plugin>) -> Result<()> {
        self.shared
            .plugins
            .register(Capability::Routing, plugin)
            .await
    }

    /// Submit a signal without waiting for queue space
    ///
    /// Returns `Error::QueueFull` when the queue is at capacity; the signal
    /// is dropped and the queued items are unaffected.
    pub async fn submit(&self, signal: Signal) -> Result<Submission> {
        let shared = &self.shared;
        shared.stats.submitted.fetch_add(1, Ordering::Relaxed);
        telemetry::increment(CounterMetric::SignalsSubmitted);

        let priority = match shared.plugins.evaluate_filters(&signal).await {
            FilterOutcome::Accept { priority } => priority,
            FilterOutcome::Reject { plugin } => {
                shared.stats.filtered.fetch_add(1, Ordering::Relaxed);
                telemetry::increment(CounterMetric::SignalsFiltered);
                tracing::info!(
                    signal_id = %signal.id,
                    strategy_id = %signal.strategy_id,
                    symbol = %signal.symbol,
                    %plugin,
                    "Signal rejected by filter"
                );
                return Ok(Submission::Filtered);
            }
            FilterOutcome::Panicked { plugin } => {
                shared.stats.filtered.fetch_add(1, Ordering::Relaxed);
                shared.stats.panicked.fetch_add(1, Ordering::Relaxed);
                telemetry::increment(CounterMetric::SignalsFiltered);
                telemetry::increment(CounterMetric::SignalsPanicked);
                tracing::warn!(
                    signal_id = %signal.id,
                    strategy_id = %signal.strategy_id,
                    %plugin,
                    "Signal dropped after filter panic"
                );
                return Ok(Submission::Filtered);
            }
        };

        let mut queue = shared.queue.lock().await;
        if let Err(signal) = queue.push(signal, priority) {
            let capacity = queue.capacity();
            drop(queue);
            shared.stats.dropped.fetch_add(1, Ordering::Relaxed);
            telemetry::increment(CounterMetric::SignalsDropped);
            tracing::warn!(
                signal_id = %signal.id,
                strategy_id = %signal.strategy_id,
                symbol = %signal.symbol,
                capacity,
                "Signal queue full, dropping signal"
            );
            return Err(Error::QueueFull(capacity));
        }
        telemetry::set_gauge(GaugeMetric::QueueDepth, queue.len() as f64);
        drop(queue);

        shared.notify.notify_one();
        Ok(Submission::Queued { priority })
    }

    /// Start the worker; calling it again while running is a no-op
    pub async fn start(&self) {
        let mut worker = self.worker.lock().await;
        if worker.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        self.shared.shutdown.send_replace(false);
        let shared = Arc::clone(&self.shared);
        *worker = Some(tokio::spawn(run_worker(shared)));
        tracing::info!("Signal processor started");
    }

    /// Stop the worker after the signal in flight; idempotent
    pub async fn stop(&self) {
        let handle = self.worker.lock().await.take();
        let Some(handle) = handle else {
            return;
        };
        self.shared.shutdown.send_replace(true);
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Signal processor worker ended abnormally");
        }
        tracing::info!("Signal processor stopped");
    }

    /// Suspend dequeuing; submissions still queue up to capacity
    pub fn pause(&self) {
        self.shared.paused.send_replace(true);
    }

    /// Resume dequeuing
    pub fn resume(&self) {
        self.shared.paused.send_replace(false);
    }

    /// Signals currently queued
    pub async fn queue_len(&self) -> usize {
        self.shared.queue.lock().await.len()
    }

    /// Processor counters
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Orders accepted by the exchange, as returned by it
    pub fn subscribe_orders(&self) -> broadcast::Receiver<Order> {
        self.shared.placed_tx.subscribe()
    }
}

async fn run_worker(shared: Arc<Shared>) {
    let mut paused = shared.paused.subscribe();
    let mut shutdown = shared.shutdown.subscribe();

    loop {
        if *shutdown.borrow() {
            break;
        }
        if *paused.borrow_and_update() {
            tokio::select! {
                _ = paused.changed() => {}
                _ = shutdown.changed() => {}
            }
            continue;
        }

        let next = shared.queue.lock().await.pop();
        let Some(signal) = next else {
            tokio::select! {
                _ = shared.notify.notified() => {}
                _ = paused.changed() => {}
                _ = shutdown.changed() => {}
            }
            continue;
        };

        let signal_id = signal.id;
        let started = Instant::now();
        let outcome = AssertUnwindSafe(shared.process(signal))
            .catch_unwind()
            .await;
        shared.stats.processed.fetch_add(1, Ordering::Relaxed);
        telemetry::increment(CounterMetric::SignalsProcessed);
        telemetry::record_latency(LatencyMetric::SignalProcessing, started.elapsed());

        match outcome {
            Ok(Ok(order)) => {
                shared.stats.placed.fetch_add(1, Ordering::Relaxed);
                // nobody listening is fine
                let _ = shared.placed_tx.send(order);
            }
            Ok(Err(e)) => {
                shared.stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(%signal_id, error = %e, "Signal dropped");
            }
            Err(_) => {
                shared.stats.panicked.fetch_add(1, Ordering::Relaxed);
                telemetry::increment(CounterMetric::SignalsPanicked);
                tracing::error!(%signal_id, "Panic while processing signal, dropping it");
            }
        }
    }
}

impl Shared {
    async fn process(&self, signal: Signal) -> Result<Order> {
        let mut order = build_order(&signal)?;

        self.plugins.route(&mut order).await?;

        if let Err(e) = self.plugins.check_risk(&order).await {
            telemetry::increment(CounterMetric::OrdersRejected);
            return Err(e);
        }

        let started = Instant::now();
        let result = tokio::time::timeout(self.order_timeout, self.exchange.place_order(&order))
            .await
            .map_err(|_| Error::Timeout(self.order_timeout.as_millis() as u64))
            .and_then(|r| r);
        telemetry::record_latency(LatencyMetric::OrderSubmission, started.elapsed());

        match result {
            Ok(placed) => {
                telemetry::increment(CounterMetric::OrdersPlaced);
                tracing::info!(
                    order_id = %placed.id,
                    strategy_id = %placed.strategy_id,
                    symbol = %placed.symbol,
                    side = %placed.side,
                    quantity = %placed.quantity,
                    status = %placed.status,
                    "Order placed"
                );
                Ok(placed)
            }
            Err(e) => {
                telemetry::increment(CounterMetric::OrdersFailed);
                Err(e)
            }
        }
    }
}

/// Build an order from a signal
///
/// Symbol, quantity and price come from the payload first, then from the
/// signal fields. Quantity falls back to 1 and price to 0 (market order).
pub fn build_order(signal: &Signal) -> Result<Order> {
    if signal.side == Side::Hold {
        return Err(Error::InvalidArg(format!(
            "signal {} is HOLD and cannot become an order",
            signal.id
        )));
    }

    let symbol = signal
        .payload_str("symbol")
        .filter(|s| !s.is_empty())
        .unwrap_or(&signal.symbol)
        .to_string();
    let quantity = signal
        .payload_decimal("quantity")
        .filter(|q| *q > Decimal::ZERO)
        .or(Some(signal.quantity).filter(|q| *q > Decimal::ZERO))
        .unwrap_or(Decimal::ONE);
    let price = signal
        .payload_decimal("price")
        .filter(|p| *p >= Decimal::ZERO)
        .unwrap_or(signal.price.max(Decimal::ZERO));

    let mut order = if price.is_zero() {
        Order::market(symbol, signal.side, quantity)
    } else {
        Order::limit(symbol, signal.side, quantity, price)
    };
    order.strategy_id = signal.strategy_id.clone();
    order.client_id = Some(signal.id.to_string());
    order.meta = signal.payload.clone();
    order.validate()?;
    Ok(order)
}
