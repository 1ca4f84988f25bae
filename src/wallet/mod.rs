//! Wallet module
//!
//! Wallet balances and the repository interface consumed by the sniper and
//! auto-buy use cases. Storage layout is opaque to the core.

mod memory;
mod types;

pub use memory::InMemoryWalletRepository;
pub use types::{parse_symbol_assets, Balance, BalanceHistoryEntry, Wallet};

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Trait for wallet persistence
#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Load the wallet owned by `user_id`
    async fn get_by_user_id(&self, user_id: &str) -> Result<Wallet>;
    /// Persist a wallet
    async fn save(&self, wallet: &Wallet) -> Result<()>;
    /// Append a balance snapshot
    async fn save_balance_history(&self, entry: &BalanceHistoryEntry) -> Result<()>;
    /// Balance snapshots for an asset within `[from, to]`
    async fn get_balance_history(
        &self,
        user_id: &str,
        asset: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BalanceHistoryEntry>>;
}
