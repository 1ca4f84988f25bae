//! Built-in risk plugins

use super::limits::{meta_price, RiskChecker, RiskLimits};
use crate::error::{Error, Result};
use crate::execution::Order;
use crate::plugin::{Plugin, RiskPlugin};
use rust_decimal::Decimal;

/// Rejects orders whose quote value exceeds a ceiling
///
/// Market orders are valued at the `price` carried in their meta; without
/// one they pass.
#[derive(Debug, Clone)]
pub struct MaxOrderValuePlugin {
    checker: RiskChecker,
}

impl MaxOrderValuePlugin {
    pub fn new(max_order_value: Decimal) -> Self {
        Self {
            checker: RiskChecker::new(&RiskLimits {
                max_order_value,
                blocked_symbols: Vec::new(),
            }),
        }
    }
}

impl RiskPlugin for MaxOrderValuePlugin {
    fn before_order(&self, order: &Order) -> Result<()> {
        match self.checker.value_message(order.notional(meta_price(order))) {
            Some(message) => Err(Error::RiskRejected(message)),
            None => Ok(()),
        }
    }
}

impl Plugin for MaxOrderValuePlugin {
    fn name(&self) -> &str {
        "max_order_value"
    }

    fn as_risk(&self) -> Option<&dyn RiskPlugin> {
        Some(self)
    }
}

/// Rejects orders for blocked symbols
#[derive(Debug, Clone)]
pub struct SymbolBlocklistPlugin {
    checker: RiskChecker,
}

impl SymbolBlocklistPlugin {
    pub fn new(symbols: Vec<String>) -> Self {
        Self {
            checker: RiskChecker::new(&RiskLimits {
                max_order_value: Decimal::MAX,
                blocked_symbols: symbols,
            }),
        }
    }
}

impl RiskPlugin for SymbolBlocklistPlugin {
    fn before_order(&self, order: &Order) -> Result<()> {
        match self.checker.blocked_message(&order.symbol) {
            Some(message) => Err(Error::RiskRejected(message)),
            None => Ok(()),
        }
    }
}

impl Plugin for SymbolBlocklistPlugin {
    fn name(&self) -> &str {
        "symbol_blocklist"
    }

    fn as_risk(&self) -> Option<&dyn RiskPlugin> {
        Some(self)
    }
}
