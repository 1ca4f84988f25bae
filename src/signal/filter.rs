//! Built-in signal filter

use super::{Side, Signal};
use crate::plugin::{FilterPlugin, Plugin};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Result of applying filters to a signal
#[derive(Debug, Clone, PartialEq)]
pub enum FilterResult {
    /// Signal passed all filters
    Pass,
    /// Signal rejected
    Reject(RejectReason),
}

/// Reason for signal rejection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    /// HOLD signals carry no order
    HoldSignal,
    /// Symbol not on the allow list
    SymbolNotAllowed(String),
    /// Reference price below the configured floor
    PriceTooLow(Decimal),
    /// Reference price above the configured ceiling
    PriceTooHigh(Decimal),
    /// Negative quantity
    InvalidQuantity(Decimal),
}

/// Configuration for the built-in filter
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Symbols allowed to trade; empty allows all
    #[serde(default)]
    pub allowed_symbols: Vec<String>,
    /// Minimum reference price (0 disables)
    #[serde(default)]
    pub min_price: Decimal,
    /// Maximum reference price (0 disables)
    #[serde(default)]
    pub max_price: Decimal,
    /// Priority given to SELL signals so exits jump entries
    #[serde(default = "default_exit_priority")]
    pub exit_priority: i32,
}

fn default_exit_priority() -> i32 {
    5
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            allowed_symbols: vec![],
            min_price: Decimal::ZERO,
            max_price: Decimal::ZERO,
            exit_priority: default_exit_priority(),
        }
    }
}

/// Signal filter chain
pub struct SignalFilter {
    config: FilterConfig,
}

impl SignalFilter {
    /// Create a new signal filter with given configuration
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Apply all filters to a signal
    ///
    /// A zero price means "use the market price" and skips the price bounds.
    pub fn apply(&self, signal: &Signal) -> FilterResult {
        if signal.side == Side::Hold {
            return FilterResult::Reject(RejectReason::HoldSignal);
        }

        if !self.config.allowed_symbols.is_empty()
            && !self.config.allowed_symbols.contains(&signal.symbol)
        {
            return FilterResult::Reject(RejectReason::SymbolNotAllowed(signal.symbol.clone()));
        }

        if signal.quantity < Decimal::ZERO {
            return FilterResult::Reject(RejectReason::InvalidQuantity(signal.quantity));
        }

        if !signal.price.is_zero() {
            if !self.config.min_price.is_zero() && signal.price < self.config.min_price {
                return FilterResult::Reject(RejectReason::PriceTooLow(signal.price));
            }
            if !self.config.max_price.is_zero() && signal.price > self.config.max_price {
                return FilterResult::Reject(RejectReason::PriceTooHigh(signal.price));
            }
        }

        FilterResult::Pass
    }
}

impl FilterPlugin for SignalFilter {
    fn validate(&self, signal: &Signal) -> bool {
        match self.apply(signal) {
            FilterResult::Pass => true,
            FilterResult::Reject(reason) => {
                tracing::debug!(signal_id = %signal.id, ?reason, "Signal filtered");
                false
            }
        }
    }

    fn priority(&self, signal: &Signal) -> i32 {
        match signal.side {
            Side::Sell => self.config.exit_priority,
            _ => 0,
        }
    }
}

impl Plugin for SignalFilter {
    fn name(&self) -> &str {
        "signal_filter"
    }

    fn as_filter(&self) -> Option<&dyn FilterPlugin> {
        Some(self)
    }
}
