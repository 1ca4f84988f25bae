//! Sniper controller

use super::{SniperConfig, SniperService, SniperStatus};
use crate::error::{Error, Result};
use crate::execution::Order;
use crate::market::{CoinEvent, CoinRepository, EventBus};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Hard deadline for an auto-snipe triggered by a listing event
pub const AUTO_SNIPE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Default)]
struct AutoSnipe {
    enabled: bool,
    config: Option<SniperConfig>,
}

/// Gate between listing events and the sniper service
pub struct SniperController {
    service: Option<Arc<dyn SniperService>>,
    coins: Arc<dyn CoinRepository>,
    auto: RwLock<AutoSnipe>,
}

impl SniperController {
    /// Create a controller and start the service
    pub async fn new(
        service: Option<Arc<dyn SniperService>>,
        coins: Arc<dyn CoinRepository>,
    ) -> Self {
        if let Some(service) = &service {
            if let Err(e) = service.start().await {
                tracing::error!(error = %e, "Failed to start sniper service");
            }
        }
        Self {
            service,
            coins,
            auto: RwLock::new(AutoSnipe::default()),
        }
    }

    fn service(&self) -> Result<&Arc<dyn SniperService>> {
        self.service.as_ref().ok_or(Error::SniperNotInitialized)
    }

    pub async fn execute_snipe(&self, symbol: &str) -> Result<Order> {
        let service = self.service()?;
        tracing::info!(%symbol, "Executing snipe");
        let order = service.execute_snipe(symbol).await.inspect_err(|e| {
            tracing::error!(%symbol, error = %e, "Failed to execute snipe");
        })?;
        tracing::info!(
            %symbol,
            order_id = %order.id,
            quantity = %order.quantity,
            "Snipe executed successfully"
        );
        Ok(order)
    }

    pub async fn execute_snipe_with_config(
        &self,
        symbol: &str,
        config: &SniperConfig,
    ) -> Result<Order> {
        let service = self.service()?;
        config.validate()?;
        tracing::info!(
            %symbol,
            max_buy_amount = %config.max_buy_amount,
            max_price = %config.max_price_per_token,
            "Executing snipe with custom config"
        );
        let order = service
            .execute_snipe_with_config(symbol, config)
            .await
            .inspect_err(|e| {
                tracing::error!(%symbol, error = %e, "Failed to execute snipe with custom config");
            })?;
        tracing::info!(
            %symbol,
            order_id = %order.id,
            quantity = %order.quantity,
            "Snipe executed successfully"
        );
        Ok(order)
    }

    pub async fn get_config(&self) -> Result<SniperConfig> {
        Ok(self.service()?.get_config().await)
    }

    pub async fn update_config(&self, config: SniperConfig) -> Result<()> {
        self.service()?.update_config(config).await
    }

    pub async fn start(&self) -> Result<()> {
        self.service()?.start().await
    }

    pub async fn stop(&self) -> Result<()> {
        self.service()?.stop().await
    }

    pub fn status(&self) -> Result<SniperStatus> {
        Ok(self.service()?.status())
    }

    /// Toggle auto-snipe
    ///
    /// Enabling without a config inherits the service's current config.
    pub async fn setup_auto_snipe(
        &self,
        enabled: bool,
        config: Option<SniperConfig>,
    ) -> Result<()> {
        let service = self.service()?;
        let config = match (enabled, config) {
            (true, Some(config)) => {
                config.validate()?;
                Some(config)
            }
            (true, None) => Some(service.get_config().await),
            (false, _) => None,
        };

        let mut auto = self.auto.write().await;
        auto.enabled = enabled;
        if config.is_some() {
            auto.config = config;
        }
        tracing::info!(enabled, "Auto-snipe configuration updated");
        Ok(())
    }

    pub async fn auto_snipe_enabled(&self) -> bool {
        self.auto.read().await.enabled
    }

    /// Listen for coins becoming tradable on `bus`
    pub async fn subscribe(self: &Arc<Self>, bus: &EventBus) {
        let weak: Weak<Self> = Arc::downgrade(self);
        bus.subscribe(Arc::new(move |event: &CoinEvent| {
            if !event.became_tradable() {
                return;
            }
            if let Some(controller) = weak.upgrade() {
                let event = event.clone();
                tokio::spawn(async move { controller.handle_tradable(event).await });
            }
        }))
        .await;
    }

    /// Auto-snipe a coin that just became tradable
    ///
    /// Returns the spawned snipe task, or `None` when auto-snipe is off.
    pub async fn handle_tradable(self: Arc<Self>, event: CoinEvent) -> Option<JoinHandle<()>> {
        let config = {
            let auto = self.auto.read().await;
            if !auto.enabled {
                return None;
            }
            auto.config.clone()?
        };

        let coin_id = event.coin.id;
        let task = tokio::spawn(async move {
            tracing::info!(%coin_id, event_type = event.event_type(), "Auto-sniping new listing");
            let snipe = async {
                let coin = self
                    .coins
                    .get_by_id(coin_id)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("coin {}", coin_id)))?;
                self.service()?
                    .execute_snipe_with_config(&coin.symbol, &config)
                    .await
            };

            match tokio::time::timeout(AUTO_SNIPE_TIMEOUT, snipe).await {
                Ok(Ok(order)) => {
                    tracing::info!(
                        symbol = %order.symbol,
                        order_id = %order.id,
                        "Auto-snipe executed successfully"
                    )
                }
                Ok(Err(e)) => {
                    tracing::error!(%coin_id, error = %e, "Failed to auto-snipe new listing")
                }
                Err(_) => tracing::error!(%coin_id, "Auto-snipe timed out"),
            }
        });
        Some(task)
    }
}
