//! Execution module
//!
//! Order model, the exchange client interface, an in-memory paper exchange
//! and order status reconciliation.

mod paper;
mod reconcile;
mod types;

pub use paper::PaperExchange;
pub use reconcile::OrderTracker;
pub use types::{
    Kline, Order, OrderBookSnapshot, OrderStatus, OrderType, PriceLevel, SymbolInfo, Ticker,
    TimeInForce,
};

use crate::error::Result;
use crate::market::Listing;
use crate::wallet::Wallet;
use async_trait::async_trait;

/// Trait for exchange client implementations
///
/// Calls may block on the network. Callers bound them with
/// `tokio::time::timeout`; dropping the future aborts the call.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Submit an order, returning it with exchange id and status set
    async fn place_order(&self, order: &Order) -> Result<Order>;
    /// Cancel an open order
    async fn cancel_order(&self, symbol: &str, exchange_id: &str) -> Result<()>;
    /// Current state of an order
    async fn get_order_status(&self, symbol: &str, exchange_id: &str) -> Result<Order>;
    /// Orders that are not yet terminal
    async fn get_open_orders(&self, symbol: &str) -> Result<Vec<Order>>;
    /// Account balances
    async fn get_account(&self) -> Result<Wallet>;
    /// Recently listed symbols
    async fn get_new_listings(&self) -> Result<Vec<Listing>>;
    /// Trading rules for a symbol
    async fn get_symbol_info(&self, symbol: &str) -> Result<SymbolInfo>;
    /// Latest ticker for a symbol
    async fn get_ticker(&self, symbol: &str) -> Result<Ticker>;
    /// Historical bars, most recent last
    async fn get_klines(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Kline>>;
    /// Order book snapshot
    async fn get_order_book(&self, symbol: &str, depth: usize) -> Result<OrderBookSnapshot>;
}
