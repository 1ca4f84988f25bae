//! Plugin module
//!
//! Extension points consulted by the signal processor and the executor.
//! A provider implements [`Plugin`] and exposes each capability it supports
//! through the `as_*` accessors; registration rejects providers that lack
//! the requested capability.

mod registry;

pub use registry::{FilterOutcome, PluginRegistry};

use crate::error::Result;
use crate::execution::Order;
use crate::signal::Signal;
use serde_json::Value;
use std::fmt;

/// Validates signals and assigns them a priority
pub trait FilterPlugin: Send + Sync {
    /// Return false to drop the signal
    fn validate(&self, signal: &Signal) -> bool;
    /// Higher runs first; the highest value across plugins wins
    fn priority(&self, _signal: &Signal) -> i32 {
        0
    }
}

/// Rewrites or vetoes orders before risk checks
pub trait RoutingPlugin: Send + Sync {
    fn route(&self, order: &mut Order) -> Result<()>;
}

/// Vetoes orders before they reach the exchange
pub trait RiskPlugin: Send + Sync {
    fn before_order(&self, order: &Order) -> Result<()>;
}

/// Receives lifecycle events for metrics collection
pub trait MetricsPlugin: Send + Sync {
    fn record_event(&self, event: &str, data: &Value);
}

/// A registered extension
pub trait Plugin: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    fn as_filter(&self) -> Option<&dyn FilterPlugin> {
        None
    }

    fn as_routing(&self) -> Option<&dyn RoutingPlugin> {
        None
    }

    fn as_risk(&self) -> Option<&dyn RiskPlugin> {
        None
    }

    fn as_metrics(&self) -> Option<&dyn MetricsPlugin> {
        None
    }
}

/// Plugin capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Filter,
    Routing,
    Risk,
    Metrics,
}

impl Capability {
    /// Whether `plugin` exposes this capability
    pub fn supported_by(&self, plugin: &dyn Plugin) -> bool {
        match self {
            Capability::Filter => plugin.as_filter().is_some(),
            Capability::Routing => plugin.as_routing().is_some(),
            Capability::Risk => plugin.as_risk().is_some(),
            Capability::Metrics => plugin.as_metrics().is_some(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Filter => "filter",
            Capability::Routing => "routing",
            Capability::Risk => "risk",
            Capability::Metrics => "metrics",
        };
        f.write_str(name)
    }
}
