//! Order risk limits

use crate::error::{Error, Result};
use crate::execution::Order;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Static limits applied to every order
#[derive(Debug, Clone, Deserialize)]
pub struct RiskLimits {
    /// Maximum quote value of a single order
    #[serde(default = "default_max_order_value")]
    pub max_order_value: Decimal,
    /// Symbols that must never be traded
    #[serde(default)]
    pub blocked_symbols: Vec<String>,
}

fn default_max_order_value() -> Decimal {
    dec!(1000)
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_order_value: default_max_order_value(),
            blocked_symbols: Vec::new(),
        }
    }
}

/// A single violated constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Constraint name, e.g. `max_order_value`
    pub rule: String,
    pub message: String,
}

/// Evaluates orders against [`RiskLimits`]
#[derive(Debug, Clone)]
pub struct RiskChecker {
    max_order_value: Decimal,
    blocked: HashSet<String>,
}

impl RiskChecker {
    pub fn new(limits: &RiskLimits) -> Self {
        Self {
            max_order_value: limits.max_order_value,
            blocked: limits
                .blocked_symbols
                .iter()
                .map(|s| s.to_ascii_uppercase())
                .collect(),
        }
    }

    /// Every constraint the order violates; empty means allowed
    ///
    /// `reference_price` values market orders, which carry no price.
    pub fn assess(&self, order: &Order, reference_price: Decimal) -> Vec<RiskAssessment> {
        let mut violations = Vec::new();

        if let Some(message) = self.blocked_message(&order.symbol) {
            violations.push(RiskAssessment {
                rule: "symbol_blocklist".into(),
                message,
            });
        }
        if let Some(message) = self.value_message(order.notional(reference_price)) {
            violations.push(RiskAssessment {
                rule: "max_order_value".into(),
                message,
            });
        }
        violations
    }

    /// Fail with `RiskRejected` when any constraint is violated
    pub fn check(&self, order: &Order, reference_price: Decimal) -> Result<()> {
        let violations = self.assess(order, reference_price);
        if violations.is_empty() {
            return Ok(());
        }
        let summary = violations
            .iter()
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        Err(Error::RiskRejected(summary))
    }

    pub(crate) fn blocked_message(&self, symbol: &str) -> Option<String> {
        self.blocked
            .contains(&symbol.to_ascii_uppercase())
            .then(|| format!("symbol {} is blocked", symbol))
    }

    pub(crate) fn value_message(&self, value: Decimal) -> Option<String> {
        (value > self.max_order_value).then(|| {
            format!(
                "order value {} exceeds maximum {}",
                value.round_dp(8),
                self.max_order_value
            )
        })
    }
}

/// Price used to value an order that carries none
///
/// Reads the `price` meta entry that signal-built orders inherit.
pub(crate) fn meta_price(order: &Order) -> Decimal {
    match order.meta.get("price") {
        Some(serde_json::Value::String(s)) => Decimal::from_str(s).unwrap_or(Decimal::ZERO),
        Some(serde_json::Value::Number(n)) => {
            Decimal::from_str(&n.to_string()).unwrap_or(Decimal::ZERO)
        }
        _ => Decimal::ZERO,
    }
}
