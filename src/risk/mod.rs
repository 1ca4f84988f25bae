//! Risk module
//!
//! Order value and symbol limits, exposed both as risk plugins for the
//! execution pipeline and as a [`RiskChecker`] for rule engines.

mod limits;
mod plugins;

pub use limits::{RiskAssessment, RiskChecker, RiskLimits};
pub use plugins::{MaxOrderValuePlugin, SymbolBlocklistPlugin};

use crate::plugin::Plugin;
use std::sync::Arc;

/// Risk plugins for the configured limits
///
/// The blocklist plugin is only built when symbols are listed.
pub fn builtin_plugins(limits: &RiskLimits) -> Vec<Arc<dyn Plugin>> {
    let mut plugins: Vec<Arc<dyn Plugin>> =
        vec![Arc::new(MaxOrderValuePlugin::new(limits.max_order_value))];
    if !limits.blocked_symbols.is_empty() {
        plugins.push(Arc::new(SymbolBlocklistPlugin::new(limits.blocked_symbols.clone())));
    }
    plugins
}
