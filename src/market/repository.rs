//! New-coin persistence

use super::NewCoin;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Trait for new-coin storage
#[async_trait]
pub trait CoinRepository: Send + Sync {
    /// Insert or replace a coin, keyed by symbol
    async fn save(&self, coin: &NewCoin) -> Result<()>;
    /// Look up a coin by symbol
    async fn get_by_symbol(&self, symbol: &str) -> Result<Option<NewCoin>>;
    /// Look up a coin by detector id
    async fn get_by_id(&self, id: Uuid) -> Result<Option<NewCoin>>;
    /// Every stored coin
    async fn list(&self) -> Result<Vec<NewCoin>>;
}

/// Coin repository backed by a map
#[derive(Default)]
pub struct InMemoryCoinRepository {
    coins: RwLock<HashMap<String, NewCoin>>,
}

impl InMemoryCoinRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CoinRepository for InMemoryCoinRepository {
    async fn save(&self, coin: &NewCoin) -> Result<()> {
        self.coins
            .write()
            .await
            .insert(coin.symbol.clone(), coin.clone());
        Ok(())
    }

    async fn get_by_symbol(&self, symbol: &str) -> Result<Option<NewCoin>> {
        Ok(self.coins.read().await.get(symbol).cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<NewCoin>> {
        Ok(self
            .coins
            .read()
            .await
            .values()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<NewCoin>> {
        let mut coins: Vec<NewCoin> = self.coins.read().await.values().cloned().collect();
        coins.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(coins)
    }
}
