//! Exchange-backed sniper service

use super::{SniperConfig, SniperStatus};
use crate::error::{Error, Result};
use crate::execution::{ExchangeClient, Order, OrderStatus};
use crate::signal::Side;
use crate::telemetry::{self, CounterMetric, LatencyMetric};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, Semaphore};

/// Strategy id stamped on sniper orders
pub const SNIPER_STRATEGY_ID: &str = "sniper";

/// Exchange-facing buy-on-listing capability
#[async_trait]
pub trait SniperService: Send + Sync {
    /// Snipe with the service configuration
    async fn execute_snipe(&self, symbol: &str) -> Result<Order>;
    /// Snipe with an explicit configuration
    async fn execute_snipe_with_config(&self, symbol: &str, config: &SniperConfig) -> Result<Order>;
    async fn get_config(&self) -> SniperConfig;
    async fn update_config(&self, config: SniperConfig) -> Result<()>;
    async fn start(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;
    fn status(&self) -> SniperStatus;
}

/// Sniper service placing MARKET buys through an [`ExchangeClient`]
pub struct ExchangeSniperService {
    exchange: Arc<dyn ExchangeClient>,
    config: RwLock<SniperConfig>,
    running: AtomicBool,
    permits: RwLock<Arc<Semaphore>>,
}

impl ExchangeSniperService {
    /// Create a stopped service
    pub fn new(exchange: Arc<dyn ExchangeClient>, config: SniperConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_orders.max(1)));
        Self {
            exchange,
            config: RwLock::new(config),
            running: AtomicBool::new(false),
            permits: RwLock::new(permits),
        }
    }

    async fn check_symbol(&self, symbol: &str) -> Result<()> {
        let info = self.exchange.get_symbol_info(symbol).await?;
        if !info.is_trading() {
            return Err(Error::InvalidArg(format!(
                "{} is not trading (status {})",
                symbol, info.status
            )));
        }
        Ok(())
    }

    async fn place_with_retry(&self, order: &Order, config: &SniperConfig) -> Result<Order> {
        let attempts = config.retry_attempts.max(1);
        let delay = Duration::from_millis(config.retry_delay_ms);
        let mut last_err = None;

        for attempt in 1..=attempts {
            match self.exchange.place_order(order).await {
                Ok(placed) => return Ok(placed),
                Err(e) => {
                    tracing::warn!(
                        symbol = %order.symbol,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Retry placing snipe order"
                    );
                    last_err = Some(e);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Exchange("no attempt made".into())))
    }

    async fn place_take_profit(&self, filled: &Order, config: &SniperConfig) {
        let target = filled.avg_fill_price
            * (Decimal::ONE + config.take_profit_percent / Decimal::ONE_HUNDRED);
        let order = Order::limit(
            &filled.symbol,
            Side::Sell,
            filled.executed_qty,
            target.round_dp(8),
        )
        .with_strategy(SNIPER_STRATEGY_ID);
        match self.exchange.place_order(&order).await {
            Ok(placed) => tracing::info!(
                symbol = %placed.symbol,
                price = %placed.price,
                order_id = %placed.id,
                "Take-profit order placed"
            ),
            Err(e) => tracing::error!(
                symbol = %filled.symbol,
                error = %e,
                "Failed to place take-profit order"
            ),
        }
    }
}

#[async_trait]
impl SniperService for ExchangeSniperService {
    async fn execute_snipe(&self, symbol: &str) -> Result<Order> {
        let config = self.config.read().await.clone();
        self.execute_snipe_with_config(symbol, &config).await
    }

    async fn execute_snipe_with_config(
        &self,
        symbol: &str,
        config: &SniperConfig,
    ) -> Result<Order> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(Error::InvalidArg("sniper service is not running".into()));
        }
        if symbol.is_empty() {
            return Err(Error::InvalidArg("invalid symbol for sniping".into()));
        }

        let permits = self.permits.read().await.clone();
        let _permit = permits.try_acquire_owned().map_err(|_| {
            Error::RiskRejected("maximum concurrent orders limit reached".into())
        })?;

        let started = Instant::now();
        self.check_symbol(symbol).await?;

        let price = self.exchange.get_ticker(symbol).await?.price;
        if price <= Decimal::ZERO {
            return Err(Error::Exchange(format!("no valid price for {}", symbol)));
        }
        if price > config.max_price_per_token {
            tracing::warn!(
                %symbol,
                %price,
                max_price = %config.max_price_per_token,
                "Price exceeds maximum allowed price"
            );
            return Err(Error::RiskRejected(format!(
                "price {} exceeds maximum {}",
                price, config.max_price_per_token
            )));
        }
        if let Some(trigger) = &config.trigger {
            if !trigger.is_met(price) {
                return Err(Error::MarketConditionNotMet(format!(
                    "price {} has not crossed {}",
                    price, trigger.threshold
                )));
            }
        }

        let quantity = (config.max_buy_amount / price).round_dp(8);
        let order = Order::market(symbol, Side::Buy, quantity).with_strategy(SNIPER_STRATEGY_ID);
        let placed = self.place_with_retry(&order, config).await?;

        telemetry::record_latency(LatencyMetric::Snipe, started.elapsed());
        telemetry::increment(CounterMetric::SnipesExecuted);
        tracing::info!(
            %symbol,
            %quantity,
            %price,
            order_id = %placed.id,
            latency_ms = started.elapsed().as_millis() as u64,
            "Snipe executed"
        );

        if placed.status == OrderStatus::Filled {
            let ceiling = price * (Decimal::ONE + config.slippage_percent / Decimal::ONE_HUNDRED);
            if placed.avg_fill_price > ceiling {
                tracing::warn!(
                    %symbol,
                    fill = %placed.avg_fill_price,
                    quoted = %price,
                    "Snipe filled beyond slippage limit"
                );
            }
            if config.enable_take_profit {
                self.place_take_profit(&placed, config).await;
            }
        }

        Ok(placed)
    }

    async fn get_config(&self) -> SniperConfig {
        self.config.read().await.clone()
    }

    async fn update_config(&self, config: SniperConfig) -> Result<()> {
        config.validate()?;
        let mut current = self.config.write().await;
        if current.max_concurrent_orders != config.max_concurrent_orders {
            *self.permits.write().await = Arc::new(Semaphore::new(config.max_concurrent_orders));
        }
        *current = config;
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        if !self.running.swap(true, Ordering::SeqCst) {
            tracing::info!("Sniper service started");
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if self.running.swap(false, Ordering::SeqCst) {
            tracing::info!("Sniper service stopped");
        }
        Ok(())
    }

    fn status(&self) -> SniperStatus {
        if self.running.load(Ordering::SeqCst) {
            SniperStatus::Running
        } else {
            SniperStatus::Stopped
        }
    }
}
