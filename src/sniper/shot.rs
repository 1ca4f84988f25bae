//! User-initiated sniper shots

use super::{SnipeRequest, SnipeResult};
use crate::error::{Error, Result};
use crate::execution::{ExchangeClient, Order, OrderTracker, OrderType};
use crate::signal::Side;
use crate::telemetry::{self, LatencyMetric};
use crate::wallet::{parse_symbol_assets, WalletRepository};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Cost multiplier applied to MARKET buys in the balance pre-check
const MARKET_SLIPPAGE_BUFFER: Decimal = dec!(1.05);

/// Interval between trigger price checks
pub const TRIGGER_POLL_INTERVAL: Duration = Duration::from_millis(500);

struct ShotRecord {
    user_id: String,
    symbol: String,
    exchange_id: String,
}

/// Validates, funds-checks and executes sniper shots for users
pub struct SniperShotUseCase {
    exchange: Arc<dyn ExchangeClient>,
    wallets: Arc<dyn WalletRepository>,
    shots: RwLock<HashMap<Uuid, ShotRecord>>,
    tracker: Mutex<OrderTracker>,
    poll_interval: Duration,
}

impl SniperShotUseCase {
    pub fn new(exchange: Arc<dyn ExchangeClient>, wallets: Arc<dyn WalletRepository>) -> Self {
        Self {
            exchange,
            wallets,
            shots: RwLock::new(HashMap::new()),
            tracker: Mutex::new(OrderTracker::new()),
            poll_interval: TRIGGER_POLL_INTERVAL,
        }
    }

    /// Override the trigger poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Execute a shot
    ///
    /// Invalid requests and failed balance checks are errors. A trigger
    /// that never fires or a rejected order yields an unsuccessful result.
    pub async fn execute(&self, mut request: SnipeRequest) -> Result<SnipeResult> {
        request.validate()?;
        let started = Instant::now();

        let wallet = self.wallets.get_by_user_id(&request.user_id).await?;
        let (base, quote) = parse_symbol_assets(&request.symbol);
        match request.side {
            Side::Buy => {
                let reference = self.reference_price(&request).await?;
                let mut required = request.quantity * reference;
                if request.order_type == OrderType::Market {
                    required *= MARKET_SLIPPAGE_BUFFER;
                }
                let available = wallet.free(&quote);
                if available < required {
                    return Err(Error::InsufficientFunds {
                        asset: quote,
                        required,
                        available,
                    });
                }
            }
            Side::Sell => {
                let available = wallet.free(&base);
                if available < request.quantity {
                    return Err(Error::InsufficientFunds {
                        asset: base,
                        required: request.quantity,
                        available,
                    });
                }
            }
            Side::Hold => return Err(Error::InvalidArg("invalid order side".into())),
        }

        tracing::info!(
            user_id = %request.user_id,
            symbol = %request.symbol,
            side = %request.side,
            quantity = %request.quantity,
            "Sniper shot initiated"
        );

        let outcome = tokio::time::timeout(request.time_limit, async {
            self.await_trigger(&request).await?;
            self.exchange.place_order(&request.to_order()).await
        })
        .await
        .unwrap_or_else(|_| {
            Err(Error::Canceled(format!(
                "sniper shot not executed within {}ms",
                request.time_limit.as_millis()
            )))
        });

        let latency = started.elapsed();
        telemetry::record_latency(LatencyMetric::Snipe, latency);
        let result = match outcome {
            Ok(order) => {
                self.remember(&request.user_id, &order).await;
                tracing::info!(
                    symbol = %order.symbol,
                    order_id = %order.id,
                    latency_ms = latency.as_millis() as u64,
                    "Sniper shot executed"
                );
                SnipeResult {
                    success: true,
                    order: Some(order),
                    error: None,
                    timestamp: Utc::now(),
                    latency,
                }
            }
            Err(e) => {
                tracing::warn!(symbol = %request.symbol, error = %e, "Sniper shot failed");
                SnipeResult {
                    success: false,
                    order: None,
                    error: Some(e.to_string()),
                    timestamp: Utc::now(),
                    latency,
                }
            }
        };
        Ok(result)
    }

    /// Cancel a shot's order on behalf of its owner
    pub async fn cancel(&self, user_id: &str, order_id: Uuid) -> Result<()> {
        let (symbol, exchange_id) = self.owned(user_id, order_id).await?;
        self.exchange.cancel_order(&symbol, &exchange_id).await?;
        tracing::info!(%user_id, %order_id, "Sniper shot cancelled");
        Ok(())
    }

    /// Latest status of a shot's order
    ///
    /// Stale exchange responses never move the reported status backwards.
    pub async fn order_status(&self, user_id: &str, order_id: Uuid) -> Result<Order> {
        let (symbol, exchange_id) = self.owned(user_id, order_id).await?;
        let current = self.exchange.get_order_status(&symbol, &exchange_id).await?;

        let mut tracker = self.tracker.lock().await;
        tracker.apply(&current);
        Ok(tracker.get(&exchange_id).cloned().unwrap_or(current))
    }

    async fn reference_price(&self, request: &SnipeRequest) -> Result<Decimal> {
        if request.price > Decimal::ZERO {
            return Ok(request.price);
        }
        Ok(self.exchange.get_ticker(&request.symbol).await?.price)
    }

    async fn await_trigger(&self, request: &SnipeRequest) -> Result<()> {
        let Some(trigger) = request.trigger() else {
            return Ok(());
        };
        tracing::info!(
            symbol = %request.symbol,
            threshold = %trigger.threshold,
            comparison = ?trigger.comparison,
            "Waiting for trigger condition"
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            interval.tick().await;
            match self.exchange.get_ticker(&request.symbol).await {
                Ok(ticker) if trigger.is_met(ticker.price) => {
                    tracing::info!(
                        symbol = %request.symbol,
                        price = %ticker.price,
                        "Trigger condition met"
                    );
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(
                    symbol = %request.symbol,
                    error = %e,
                    "Failed to get current price"
                ),
            }
        }
    }

    async fn remember(&self, user_id: &str, order: &Order) {
        let Some(exchange_id) = order.exchange_id.clone() else {
            return;
        };
        self.tracker.lock().await.apply(order);
        self.shots.write().await.insert(
            order.id,
            ShotRecord {
                user_id: user_id.to_string(),
                symbol: order.symbol.clone(),
                exchange_id,
            },
        );
    }

    async fn owned(&self, user_id: &str, order_id: Uuid) -> Result<(String, String)> {
        let shots = self.shots.read().await;
        let record = shots
            .get(&order_id)
            .ok_or_else(|| Error::NotFound(format!("sniper shot order {}", order_id)))?;
        if record.user_id != user_id {
            return Err(Error::InvalidArg("order does not belong to the user".into()));
        }
        Ok((record.symbol.clone(), record.exchange_id.clone()))
    }
}
