//! Auto-buy rule engine

use super::{AutoBuyExecution, AutoBuyRepository, AutoBuyRule};
use crate::error::{Error, ErrorKind, Result};
use crate::execution::{ExchangeClient, Order, OrderType, Ticker};
use crate::risk::{RiskChecker, RiskLimits};
use crate::signal::Side;
use crate::telemetry::{self, CounterMetric};
use crate::wallet::{parse_symbol_assets, WalletRepository};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

/// Strategy id stamped on auto-buy orders
pub const AUTOBUY_STRATEGY_ID: &str = "autobuy";

/// Auto-buy evaluation settings
#[derive(Debug, Clone, Deserialize)]
pub struct AutoBuyConfig {
    #[serde(default = "default_evaluation_interval_secs")]
    pub evaluation_interval_secs: u64,
}

fn default_evaluation_interval_secs() -> u64 {
    10
}

impl Default for AutoBuyConfig {
    fn default() -> Self {
        Self {
            evaluation_interval_secs: default_evaluation_interval_secs(),
        }
    }
}

/// Manages auto-buy rules and turns satisfied ones into orders
pub struct AutoBuyService {
    exchange: Arc<dyn ExchangeClient>,
    wallets: Arc<dyn WalletRepository>,
    rules: Arc<dyn AutoBuyRepository>,
    risk: RiskChecker,
    interval: Duration,
    shutdown: watch::Sender<bool>,
}

impl AutoBuyService {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        wallets: Arc<dyn WalletRepository>,
        rules: Arc<dyn AutoBuyRepository>,
        limits: &RiskLimits,
        config: AutoBuyConfig,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            exchange,
            wallets,
            rules,
            risk: RiskChecker::new(limits),
            interval: Duration::from_secs(config.evaluation_interval_secs.max(1)),
            shutdown,
        }
    }

    /// Store a new rule after validating it against the exchange
    pub async fn create_rule(&self, mut rule: AutoBuyRule) -> Result<AutoBuyRule> {
        rule.validate()?;
        self.exchange.get_symbol_info(&rule.symbol).await?;

        let now = Utc::now();
        rule.created_at = now;
        rule.updated_at = now;
        rule.execution_count = 0;
        rule.last_triggered = None;
        self.rules.create(&rule).await?;

        tracing::info!(
            rule_id = %rule.id,
            user_id = %rule.user_id,
            symbol = %rule.symbol,
            trigger = %rule.trigger_type,
            "Auto-buy rule created"
        );
        Ok(rule)
    }

    pub async fn get_rule(&self, id: Uuid) -> Result<AutoBuyRule> {
        self.rules
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("auto-buy rule {}", id)))
    }

    pub async fn list_rules(&self, user_id: &str) -> Result<Vec<AutoBuyRule>> {
        self.rules.list_by_user(user_id).await
    }

    /// Replace a rule's settings, keeping its execution bookkeeping
    pub async fn update_rule(&self, mut rule: AutoBuyRule) -> Result<AutoBuyRule> {
        rule.validate()?;
        let existing = self.get_rule(rule.id).await?;
        if existing.symbol != rule.symbol {
            self.exchange.get_symbol_info(&rule.symbol).await?;
        }

        rule.created_at = existing.created_at;
        rule.execution_count = existing.execution_count;
        rule.last_triggered = existing.last_triggered;
        rule.last_price = existing.last_price;
        rule.updated_at = Utc::now();
        self.rules.update(&rule).await?;
        Ok(rule)
    }

    pub async fn delete_rule(&self, id: Uuid) -> Result<()> {
        self.rules.delete(id).await?;
        tracing::info!(rule_id = %id, "Auto-buy rule deleted");
        Ok(())
    }

    /// Execution history of a rule, oldest first
    pub async fn executions(&self, rule_id: Uuid) -> Result<Vec<AutoBuyExecution>> {
        self.rules.executions(rule_id).await
    }

    /// Evaluate every enabled rule once
    ///
    /// Returns the orders placed. A rule that fails does not stop the pass.
    pub async fn evaluate_rules(&self) -> Result<Vec<Order>> {
        let rules = self.rules.list_active().await?;
        let mut placed = Vec::new();

        for rule in rules {
            match self.evaluate(rule).await {
                Ok(order) => placed.push(order),
                Err(e) if e.kind() == ErrorKind::MarketConditionNotMet => {
                    tracing::debug!(reason = %e, "Auto-buy rule not triggered");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Auto-buy rule evaluation failed");
                }
            }
        }
        Ok(placed)
    }

    /// Evaluate a single rule now
    ///
    /// `Ok(None)` means the rule is disabled, cooling down or its trigger
    /// did not fire.
    pub async fn execute_rule(&self, id: Uuid) -> Result<Option<Order>> {
        let rule = self.get_rule(id).await?;
        if !rule.enabled {
            return Ok(None);
        }
        match self.evaluate(rule).await {
            Ok(order) => Ok(Some(order)),
            Err(e) if e.kind() == ErrorKind::MarketConditionNotMet => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Evaluate rules on the configured interval until stopped
    pub async fn run(&self) {
        let mut shutdown = self.shutdown.subscribe();
        let mut interval = tokio::time::interval(self.interval);
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Auto-buy engine started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.evaluate_rules().await {
                        tracing::warn!(error = %e, "Auto-buy evaluation pass failed");
                    }
                }
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!("Auto-buy engine stopped");
    }

    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    async fn evaluate(&self, mut rule: AutoBuyRule) -> Result<Order> {
        let now = Utc::now();
        if rule.is_cooling_down(now) {
            return Err(Error::MarketConditionNotMet(format!(
                "rule {} cooling down until {}",
                rule.id,
                rule.cooldown_until().unwrap_or(now)
            )));
        }

        let ticker = self.exchange.get_ticker(&rule.symbol).await?;
        if !rule.is_triggered(&ticker) {
            return Err(Error::MarketConditionNotMet(format!(
                "rule {} {} {} not met at {}",
                rule.id, rule.trigger_type, rule.trigger_value, ticker.price
            )));
        }

        let quote = rule
            .quote_asset
            .clone()
            .unwrap_or_else(|| parse_symbol_assets(&rule.symbol).1);
        let wallet = self.wallets.get_by_user_id(&rule.user_id).await?;
        let available = wallet.free(&quote);
        if available < rule.buy_amount_quote {
            return Err(Error::InsufficientFunds {
                asset: quote,
                required: rule.buy_amount_quote,
                available,
            });
        }

        let order = build_order(&rule, &ticker)?;
        if rule.enable_risk_check {
            self.risk.check(&order, ticker.price)?;
        }

        let placed = match self.exchange.place_order(&order).await {
            Ok(placed) => placed,
            Err(e) => {
                telemetry::increment(CounterMetric::OrdersFailed);
                return Err(e);
            }
        };

        rule.record_trigger(now, ticker.price);
        self.rules.update(&rule).await?;

        let execution = AutoBuyExecution {
            id: Uuid::new_v4(),
            rule_id: rule.id,
            user_id: rule.user_id.clone(),
            symbol: rule.symbol.clone(),
            order_id: placed.id,
            price: ticker.price,
            quantity: order.quantity,
            amount: rule.buy_amount_quote,
            timestamp: now,
        };
        if let Err(e) = self.rules.record_execution(&execution).await {
            tracing::warn!(rule_id = %rule.id, error = %e, "Failed to record auto-buy execution");
        }

        telemetry::increment(CounterMetric::AutoBuyExecutions);
        tracing::info!(
            rule_id = %rule.id,
            symbol = %rule.symbol,
            price = %ticker.price,
            quantity = %order.quantity,
            executions = rule.execution_count,
            "Auto-buy rule executed"
        );
        Ok(placed)
    }
}

fn build_order(rule: &AutoBuyRule, ticker: &Ticker) -> Result<Order> {
    if ticker.price <= Decimal::ZERO {
        return Err(Error::Exchange(format!("no usable price for {}", rule.symbol)));
    }
    let quantity = (rule.buy_amount_quote / ticker.price).round_dp(8);
    let order = match rule.order_type {
        OrderType::Market => Order::market(&rule.symbol, Side::Buy, quantity),
        OrderType::Limit => Order::limit(&rule.symbol, Side::Buy, quantity, ticker.price),
    };
    order.validate()?;
    Ok(order.with_strategy(AUTOBUY_STRATEGY_ID))
}
