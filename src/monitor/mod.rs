//! Monitor module
//!
//! Tracks per-strategy status from executor hooks and publishes events and
//! alerts on two bounded channels. Sends never block: a full channel drops
//! the item with a warning.

mod types;

pub use types::{Alert, AlertLevel, Event, StrategyStatus};

use crate::error::{Error, Result};
use crate::execution::Order;
use crate::executor::{EventHook, StrategyState};
use crate::signal::Signal;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};

/// Monitor channel sizes
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    #[serde(default = "default_alert_capacity")]
    pub alert_capacity: usize,
}

fn default_event_capacity() -> usize {
    1000
}
fn default_alert_capacity() -> usize {
    100
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            alert_capacity: default_alert_capacity(),
        }
    }
}

struct Outputs {
    events: Option<mpsc::Sender<Event>>,
    alerts: Option<mpsc::Sender<Alert>>,
}

/// Strategy monitor; register it on the executor as an [`EventHook`]
pub struct Monitor {
    statuses: RwLock<HashMap<String, StrategyStatus>>,
    outputs: RwLock<Outputs>,
    event_rx: Mutex<Option<mpsc::Receiver<Event>>>,
    alert_rx: Mutex<Option<mpsc::Receiver<Alert>>>,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.event_capacity.max(1));
        let (alert_tx, alert_rx) = mpsc::channel(config.alert_capacity.max(1));
        Self {
            statuses: RwLock::new(HashMap::new()),
            outputs: RwLock::new(Outputs {
                events: Some(event_tx),
                alerts: Some(alert_tx),
            }),
            event_rx: Mutex::new(Some(event_rx)),
            alert_rx: Mutex::new(Some(alert_rx)),
        }
    }

    /// Take the event stream; only the first caller gets it
    pub async fn events(&self) -> Option<mpsc::Receiver<Event>> {
        self.event_rx.lock().await.take()
    }

    /// Take the alert stream; only the first caller gets it
    pub async fn alerts(&self) -> Option<mpsc::Receiver<Alert>> {
        self.alert_rx.lock().await.take()
    }

    /// Copy of a strategy's status; unknown ids report `unknown`
    pub async fn get_status(&self, strategy_id: &str) -> StrategyStatus {
        self.statuses
            .read()
            .await
            .get(strategy_id)
            .cloned()
            .unwrap_or_else(|| StrategyStatus::new(strategy_id))
    }

    /// Copies of every tracked status, sorted by id
    pub async fn list_statuses(&self) -> Vec<StrategyStatus> {
        let mut all: Vec<StrategyStatus> = self.statuses.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Close both output channels
    ///
    /// Fails with `Error::Timeout` if the channels cannot be closed within
    /// `timeout` (for example while a hook call holds the lock).
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        let close = async {
            let mut outputs = self.outputs.write().await;
            outputs.events.take();
            outputs.alerts.take();
        };
        tokio::time::timeout(timeout, close)
            .await
            .map_err(|_| Error::Timeout(timeout.as_millis() as u64))?;
        tracing::info!("Monitor shut down");
        Ok(())
    }

    async fn update<F>(&self, strategy_id: &str, f: F)
    where
        F: FnOnce(&mut StrategyStatus),
    {
        let mut statuses = self.statuses.write().await;
        let status = statuses
            .entry(strategy_id.to_string())
            .or_insert_with(|| StrategyStatus::new(strategy_id));
        f(status);
        status.last_update = Utc::now();
    }

    async fn emit_event(&self, event: Event) {
        tracing::info!(
            strategy_id = %event.strategy_id,
            event_type = %event.event_type,
            description = %event.description,
            "Strategy event"
        );
        let outputs = self.outputs.read().await;
        let Some(tx) = outputs.events.as_ref() else {
            return;
        };
        if tx.try_send(event).is_err() {
            tracing::warn!("Event channel full, dropping event");
        }
    }

    async fn emit_alert(&self, alert: Alert) {
        tracing::warn!(
            strategy_id = %alert.strategy_id,
            level = %alert.level,
            message = %alert.message,
            "Strategy alert"
        );
        let outputs = self.outputs.read().await;
        let Some(tx) = outputs.alerts.as_ref() else {
            return;
        };
        if tx.try_send(alert).is_err() {
            tracing::warn!("Alert channel full, dropping alert");
        }
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

#[async_trait]
impl EventHook for Monitor {
    async fn on_signal_received(&self, signal: &Signal) {
        self.update(&signal.strategy_id, |s| s.signals_handled += 1)
            .await;
        self.emit_event(Event {
            timestamp: Utc::now(),
            strategy_id: signal.strategy_id.clone(),
            event_type: "signal_received".into(),
            description: "Signal received".into(),
            error: None,
            metadata: json!({ "signal": signal }),
        })
        .await;
    }

    async fn on_order_placed(&self, order: &Order) {
        self.update(&order.strategy_id, |s| s.orders_placed += 1)
            .await;
        self.emit_event(Event {
            timestamp: Utc::now(),
            strategy_id: order.strategy_id.clone(),
            event_type: "order_placed".into(),
            description: "Order placed".into(),
            error: None,
            metadata: json!({ "order": order }),
        })
        .await;
    }

    async fn on_status_update(
        &self,
        strategy_id: &str,
        state: StrategyState,
        error: Option<&Error>,
    ) {
        let error = error.map(|e| e.to_string());
        self.update(strategy_id, |s| {
            s.status = state;
            s.last_error = error.clone();
        })
        .await;

        if let Some(message) = &error {
            self.emit_alert(Alert {
                timestamp: Utc::now(),
                strategy_id: strategy_id.to_string(),
                level: AlertLevel::Warning,
                message: format!("Strategy error: {}", message),
                error: Some(message.clone()),
            })
            .await;
        }

        self.emit_event(Event {
            timestamp: Utc::now(),
            strategy_id: strategy_id.to_string(),
            event_type: "status_update".into(),
            description: format!("Status updated to {}", state),
            error,
            metadata: serde_json::Value::Null,
        })
        .await;
    }
}
