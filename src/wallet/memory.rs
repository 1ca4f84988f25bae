//! In-memory wallet repository

use super::{BalanceHistoryEntry, Wallet, WalletRepository};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Wallet repository backed by process memory
#[derive(Default, Clone)]
pub struct InMemoryWalletRepository {
    wallets: Arc<RwLock<HashMap<String, Wallet>>>,
    history: Arc<RwLock<Vec<BalanceHistoryEntry>>>,
}

impl InMemoryWalletRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletRepository for InMemoryWalletRepository {
    async fn get_by_user_id(&self, user_id: &str) -> Result<Wallet> {
        let wallets = self.wallets.read().await;
        wallets
            .get(user_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("wallet for user {}", user_id)))
    }

    async fn save(&self, wallet: &Wallet) -> Result<()> {
        let mut wallets = self.wallets.write().await;
        wallets.insert(wallet.user_id.clone(), wallet.clone());
        Ok(())
    }

    async fn save_balance_history(&self, entry: &BalanceHistoryEntry) -> Result<()> {
        let mut history = self.history.write().await;
        history.push(entry.clone());
        Ok(())
    }

    async fn get_balance_history(
        &self,
        user_id: &str,
        asset: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BalanceHistoryEntry>> {
        let history = self.history.read().await;
        Ok(history
            .iter()
            .filter(|e| e.user_id == user_id && e.asset == asset)
            .filter(|e| e.timestamp >= from && e.timestamp <= to)
            .cloned()
            .collect())
    }
}
