//! Listing poller

use super::{CoinEvent, CoinEventKind, CoinRepository, CoinStatus, EventBus, Listing, NewCoin};
use crate::error::Result;
use crate::execution::ExchangeClient;
use crate::telemetry::{self, GaugeMetric};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

/// Detector polling settings
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Diffs exchange listings against known coins and publishes changes
pub struct NewCoinDetector {
    exchange: Arc<dyn ExchangeClient>,
    repo: Arc<dyn CoinRepository>,
    bus: Arc<EventBus>,
    known: RwLock<HashMap<String, NewCoin>>,
    poll_interval: Duration,
    shutdown: watch::Sender<bool>,
}

impl NewCoinDetector {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        repo: Arc<dyn CoinRepository>,
        bus: Arc<EventBus>,
        config: DetectorConfig,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            exchange,
            repo,
            bus,
            known: RwLock::new(HashMap::new()),
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            shutdown,
        }
    }

    /// Coin lookup by symbol from the detector's view
    pub async fn coin(&self, symbol: &str) -> Option<NewCoin> {
        self.known.read().await.get(symbol).cloned()
    }

    /// Poll listings once and publish every change
    ///
    /// Returns the events in the order they were published.
    pub async fn detect_once(&self) -> Result<Vec<CoinEvent>> {
        let listings = self.exchange.get_new_listings().await?;
        let mut events = Vec::new();

        for listing in &listings {
            self.hydrate(&listing.symbol).await;
            if let Some(event) = self.diff(listing).await {
                self.persist(&event.coin).await;
                // delivery tasks run detached
                drop(self.bus.publish(event.clone()).await);
                events.push(event);
            }
        }

        let tracked = self.known.read().await.len();
        telemetry::set_gauge(GaugeMetric::TrackedCoins, tracked as f64);
        Ok(events)
    }

    /// Pull a previously persisted coin into the known set
    async fn hydrate(&self, symbol: &str) {
        if self.known.read().await.contains_key(symbol) {
            return;
        }
        match self.repo.get_by_symbol(symbol).await {
            Ok(Some(coin)) => {
                self.known
                    .write()
                    .await
                    .entry(coin.symbol.clone())
                    .or_insert(coin);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(%symbol, error = %e, "Coin lookup failed"),
        }
    }

    async fn diff(&self, listing: &Listing) -> Option<CoinEvent> {
        let now = Utc::now();
        let mut known = self.known.write().await;

        let Some(coin) = known.get_mut(&listing.symbol) else {
            let coin = NewCoin::from_listing(listing, now);
            tracing::info!(
                symbol = %coin.symbol,
                status = %coin.status,
                coin_id = %coin.id,
                "New coin detected"
            );
            known.insert(coin.symbol.clone(), coin.clone());
            return Some(CoinEvent {
                kind: CoinEventKind::NewCoinDetected,
                coin,
                timestamp: now,
            });
        };

        if coin.status == listing.status {
            return None;
        }

        let old = coin.status;
        coin.status = listing.status;
        coin.updated_at = now;
        if listing.status == CoinStatus::Trading && coin.became_tradable_at.is_none() {
            coin.became_tradable_at = Some(now);
        }
        tracing::info!(symbol = %coin.symbol, %old, new = %listing.status, "Coin status changed");

        Some(CoinEvent {
            kind: CoinEventKind::StatusChanged {
                old,
                new: listing.status,
            },
            coin: coin.clone(),
            timestamp: now,
        })
    }

    async fn persist(&self, coin: &NewCoin) {
        if let Err(e) = self.repo.save(coin).await {
            tracing::error!(symbol = %coin.symbol, error = %e, "Failed to persist coin");
        }
    }

    /// Poll until [`stop`](Self::stop) is called
    pub async fn run(&self) {
        let mut shutdown = self.shutdown.subscribe();
        let mut interval = tokio::time::interval(self.poll_interval);
        tracing::info!(
            interval_secs = self.poll_interval.as_secs(),
            "New-coin detector started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.detect_once().await {
                        tracing::warn!(error = %e, "Listing poll failed");
                    }
                }
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!("New-coin detector stopped");
    }

    /// Stop a running poll loop
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }
}
