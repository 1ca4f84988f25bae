//! Shared plugin lists

use super::{Capability, Plugin};
use crate::error::{Error, Result};
use crate::execution::Order;
use crate::signal::Signal;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Result of running the filter chain over a signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// All filters passed; highest priority reported
    Accept { priority: i32 },
    /// A filter rejected the signal
    Reject { plugin: String },
    /// A filter panicked; the signal is treated as rejected
    Panicked { plugin: String },
}

/// Filter, routing, risk and metrics plugin lists
///
/// Each list has its own lock, held only while the list is iterated.
/// Plugins are called synchronously, so no lock is held across an await.
#[derive(Default)]
pub struct PluginRegistry {
    filters: Mutex<Vec<Arc<dyn Plugin>>>,
    routers: Mutex<Vec<Arc<dyn Plugin>>>,
    risks: Mutex<Vec<Arc<dyn Plugin>>>,
    metrics: Mutex<Vec<Arc<dyn Plugin>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn list(&self, capability: Capability) -> &Mutex<Vec<Arc<dyn Plugin>>> {
        match capability {
            Capability::Filter => &self.filters,
            Capability::Routing => &self.routers,
            Capability::Risk => &self.risks,
            Capability::Metrics => &self.metrics,
        }
    }

    /// Register a plugin for a capability it must implement
    pub async fn register(&self, capability: Capability, plugin: Arc<dyn Plugin>) -> Result<()> {
        if !capability.supported_by(plugin.as_ref()) {
            return Err(Error::InvalidArg(format!(
                "plugin {} does not implement the {} capability",
                plugin.name(),
                capability
            )));
        }
        tracing::info!(plugin = plugin.name(), %capability, "Plugin registered");
        self.list(capability).lock().await.push(plugin);
        Ok(())
    }

    /// Number of plugins registered for a capability
    pub async fn count(&self, capability: Capability) -> usize {
        self.list(capability).lock().await.len()
    }

    /// Run filters in registration order, short-circuiting on rejection
    ///
    /// A panicking filter rejects the signal and leaves the caller running.
    pub async fn evaluate_filters(&self, signal: &Signal) -> FilterOutcome {
        let filters = self.filters.lock().await;
        let mut priority = 0;
        for plugin in filters.iter() {
            let Some(filter) = plugin.as_filter() else {
                continue;
            };
            let verdict = catch_unwind(AssertUnwindSafe(|| {
                filter.validate(signal).then(|| filter.priority(signal))
            }));
            match verdict {
                Ok(Some(p)) => priority = priority.max(p),
                Ok(None) => {
                    return FilterOutcome::Reject {
                        plugin: plugin.name().to_string(),
                    }
                }
                Err(_) => {
                    tracing::error!(
                        plugin = plugin.name(),
                        signal_id = %signal.id,
                        symbol = %signal.symbol,
                        "Filter plugin panicked, rejecting signal"
                    );
                    return FilterOutcome::Panicked {
                        plugin: plugin.name().to_string(),
                    };
                }
            }
        }
        FilterOutcome::Accept { priority }
    }

    /// Run routing plugins in order; the first error aborts
    pub async fn route(&self, order: &mut Order) -> Result<()> {
        let routers = self.routers.lock().await;
        for plugin in routers.iter() {
            if let Some(router) = plugin.as_routing() {
                router.route(order)?;
            }
        }
        Ok(())
    }

    /// Run risk plugins in order; the first veto aborts
    pub async fn check_risk(&self, order: &Order) -> Result<()> {
        let risks = self.risks.lock().await;
        for plugin in risks.iter() {
            if let Some(risk) = plugin.as_risk() {
                risk.before_order(order).map_err(|e| match e {
                    Error::RiskRejected(_) => e,
                    other => Error::RiskRejected(format!("{}: {}", plugin.name(), other)),
                })?;
            }
        }
        Ok(())
    }

    /// Fan an event out to every metrics plugin
    ///
    /// A panicking plugin is logged and skipped.
    pub async fn record_event(&self, event: &str, data: &Value) {
        let metrics = self.metrics.lock().await;
        for plugin in metrics.iter() {
            let Some(sink) = plugin.as_metrics() else {
                continue;
            };
            if catch_unwind(AssertUnwindSafe(|| sink.record_event(event, data))).is_err() {
                tracing::error!(plugin = plugin.name(), event, "Metrics plugin panicked");
            }
        }
    }
}
