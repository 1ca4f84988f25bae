//! Auto-buy rule types

use crate::error::{Error, Result};
use crate::execution::{OrderType, Ticker};
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Market condition that fires a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Last price at or below the trigger value
    PriceBelow,
    /// Last price at or above the trigger value
    PriceAbove,
    /// Window change at or below minus the trigger value, in percent
    PercentDrop,
    /// Window change at or above the trigger value, in percent
    PercentRise,
    /// Window volume strictly above the trigger value
    VolumeSurge,
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriggerType::PriceBelow => "price_below",
            TriggerType::PriceAbove => "price_above",
            TriggerType::PercentDrop => "percent_drop",
            TriggerType::PercentRise => "percent_rise",
            TriggerType::VolumeSurge => "volume_surge",
        };
        f.write_str(s)
    }
}

/// A standing buy order for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoBuyRule {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub symbol: String,
    /// Quote asset for the balance check; parsed from the symbol when absent
    pub quote_asset: Option<String>,
    pub trigger_type: TriggerType,
    pub trigger_value: Decimal,
    /// Quote amount spent per execution
    pub buy_amount_quote: Decimal,
    pub cooldown_minutes: i64,
    pub order_type: OrderType,
    pub enabled: bool,
    pub enable_risk_check: bool,
    pub execution_count: u32,
    pub last_triggered: Option<DateTime<Utc>>,
    pub last_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AutoBuyRule {
    /// Enabled MARKET rule with no cooldown
    pub fn new(
        user_id: impl Into<String>,
        symbol: impl Into<String>,
        trigger_type: TriggerType,
        trigger_value: Decimal,
        buy_amount_quote: Decimal,
    ) -> Self {
        let now = Utc::now();
        let symbol = symbol.into();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            name: format!("{} {}", symbol, trigger_type),
            symbol,
            quote_asset: None,
            trigger_type,
            trigger_value,
            buy_amount_quote,
            cooldown_minutes: 0,
            order_type: OrderType::Market,
            enabled: true,
            enable_risk_check: false,
            execution_count: 0,
            last_triggered: None,
            last_price: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_cooldown(mut self, minutes: i64) -> Self {
        self.cooldown_minutes = minutes;
        self
    }

    pub fn with_risk_check(mut self, enabled: bool) -> Self {
        self.enable_risk_check = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            return Err(Error::InvalidArg("rule symbol is empty".into()));
        }
        if self.trigger_value <= Decimal::ZERO {
            return Err(Error::InvalidArg("trigger value must be positive".into()));
        }
        if self.buy_amount_quote <= Decimal::ZERO {
            return Err(Error::InvalidArg("buy amount must be positive".into()));
        }
        if self.cooldown_minutes < 0 {
            return Err(Error::InvalidArg("cooldown must not be negative".into()));
        }
        Ok(())
    }

    /// End of the current cooldown window, if any
    ///
    /// Saturates at the latest representable time, so an oversized
    /// cooldown keeps the rule cooling down forever.
    pub fn cooldown_until(&self) -> Option<DateTime<Utc>> {
        self.last_triggered.map(|t| {
            TimeDelta::try_minutes(self.cooldown_minutes)
                .and_then(|window| t.checked_add_signed(window))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        })
    }

    /// Whether the rule may fire at `now`
    pub fn is_cooling_down(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until().is_some_and(|end| now < end)
    }

    /// Evaluate the trigger against a ticker
    pub fn is_triggered(&self, ticker: &Ticker) -> bool {
        match self.trigger_type {
            TriggerType::PriceBelow => ticker.price <= self.trigger_value,
            TriggerType::PriceAbove => ticker.price >= self.trigger_value,
            TriggerType::PercentDrop => {
                percent_change(ticker).is_some_and(|pct| pct <= -self.trigger_value)
            }
            TriggerType::PercentRise => {
                percent_change(ticker).is_some_and(|pct| pct >= self.trigger_value)
            }
            TriggerType::VolumeSurge => ticker.volume > self.trigger_value,
        }
    }

    /// Stamp a successful execution
    pub fn record_trigger(&mut self, now: DateTime<Utc>, price: Decimal) {
        self.last_triggered = Some(now);
        self.last_price = price;
        self.execution_count += 1;
        self.updated_at = now;
    }
}

/// Change over the ticker window relative to the opening price
fn percent_change(ticker: &Ticker) -> Option<Decimal> {
    let open = ticker.price - ticker.price_change;
    if open <= Decimal::ZERO {
        return None;
    }
    Some(ticker.price_change / open * Decimal::ONE_HUNDRED)
}

/// Record of an order placed by a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoBuyExecution {
    pub id: Uuid,
    pub rule_id: Uuid,
    pub user_id: String,
    pub symbol: String,
    pub order_id: Uuid,
    pub price: Decimal,
    pub quantity: Decimal,
    /// Quote amount spent
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}
