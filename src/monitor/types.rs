//! Monitor records

use crate::executor::StrategyState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Running status of one strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyStatus {
    pub id: String,
    pub status: StrategyState,
    pub last_error: Option<String>,
    pub signals_handled: u64,
    pub orders_placed: u64,
    pub last_update: DateTime<Utc>,
    /// Free-form performance figures keyed by name
    pub performance: HashMap<String, f64>,
}

impl StrategyStatus {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            status: StrategyState::Unknown,
            last_error: None,
            signals_handled: 0,
            orders_placed: 0,
            last_update: Utc::now(),
            performance: HashMap::new(),
        }
    }
}

/// Monitor event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub strategy_id: String,
    /// `signal_received`, `order_placed` or `status_update`
    pub event_type: String,
    pub description: String,
    pub error: Option<String>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
            AlertLevel::Error => "error",
            AlertLevel::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Alert raised when a strategy reports an error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    pub strategy_id: String,
    pub level: AlertLevel,
    pub message: String,
    pub error: Option<String>,
}
