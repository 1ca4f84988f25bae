//! Prometheus metrics

use crate::plugin::{MetricsPlugin, Plugin};
use serde_json::Value;
use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Signal processing, dequeue to exchange response
    SignalProcessing,
    /// Exchange order submission
    OrderSubmission,
    /// Sniper execution, request to fill
    Snipe,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    SignalsSubmitted,
    SignalsFiltered,
    SignalsDropped,
    SignalsProcessed,
    SignalsPanicked,
    OrdersPlaced,
    OrdersFailed,
    OrdersRejected,
    SnipesExecuted,
    AutoBuyExecutions,
    StrategyErrors,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Signals waiting in the processor queue
    QueueDepth,
    /// Registered strategies
    ActiveStrategies,
    /// Coins tracked by the detector
    TrackedCoins,
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::SignalProcessing => "strategy_core_signal_processing_latency_ms",
        LatencyMetric::OrderSubmission => "strategy_core_order_submission_latency_ms",
        LatencyMetric::Snipe => "strategy_core_snipe_latency_ms",
    };
    metrics::histogram!(metric_name).record(duration.as_secs_f64() * 1000.0);
}

/// Increment a counter by one
pub fn increment(metric: CounterMetric) {
    let metric_name = match metric {
        CounterMetric::SignalsSubmitted => "strategy_core_signals_submitted_total",
        CounterMetric::SignalsFiltered => "strategy_core_signals_filtered_total",
        CounterMetric::SignalsDropped => "strategy_core_signals_dropped_total",
        CounterMetric::SignalsProcessed => "strategy_core_signals_processed_total",
        CounterMetric::SignalsPanicked => "strategy_core_signals_panicked_total",
        CounterMetric::OrdersPlaced => "strategy_core_orders_placed_total",
        CounterMetric::OrdersFailed => "strategy_core_orders_failed_total",
        CounterMetric::OrdersRejected => "strategy_core_orders_rejected_total",
        CounterMetric::SnipesExecuted => "strategy_core_snipes_executed_total",
        CounterMetric::AutoBuyExecutions => "strategy_core_autobuy_executions_total",
        CounterMetric::StrategyErrors => "strategy_core_strategy_errors_total",
    };
    metrics::counter!(metric_name).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::QueueDepth => "strategy_core_queue_depth",
        GaugeMetric::ActiveStrategies => "strategy_core_active_strategies",
        GaugeMetric::TrackedCoins => "strategy_core_tracked_coins",
    };
    metrics::gauge!(metric_name).set(value);
}

/// Metrics plugin counting executor lifecycle events by name
#[derive(Debug, Default)]
pub struct PrometheusMetricsPlugin;

impl MetricsPlugin for PrometheusMetricsPlugin {
    fn record_event(&self, event: &str, data: &Value) {
        metrics::counter!("strategy_core_events_total", "event" => event.to_string()).increment(1);
        tracing::trace!(event, %data, "Recorded event");
    }
}

impl Plugin for PrometheusMetricsPlugin {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn as_metrics(&self) -> Option<&dyn MetricsPlugin> {
        Some(self)
    }
}
