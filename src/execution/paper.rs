//! Paper trading exchange with simulated fills

use super::{
    ExchangeClient, Kline, Order, OrderBookSnapshot, OrderStatus, OrderType, PriceLevel,
    SymbolInfo, Ticker,
};
use crate::error::{Error, Result};
use crate::market::Listing;
use crate::signal::Side;
use crate::wallet::{parse_symbol_assets, Wallet};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct PaperState {
    orders: HashMap<String, Order>,
    placed: Vec<Order>,
    tickers: HashMap<String, Ticker>,
    klines: HashMap<String, Vec<Kline>>,
    listings: Vec<Listing>,
    symbols: HashMap<String, SymbolInfo>,
    wallet: Option<Wallet>,
}

/// In-memory exchange
///
/// Market orders fill at the last ticker price. Marketable limit orders
/// fill at their limit price; the rest stay open until canceled. Balances
/// are adjusted on fill but never enforced.
pub struct PaperExchange {
    fee_rate: Decimal,
    state: Arc<RwLock<PaperState>>,
    fail_orders: AtomicUsize,
    place_calls: AtomicUsize,
}

impl PaperExchange {
    /// Create a new paper exchange
    pub fn new(fee_rate: Decimal) -> Self {
        Self {
            fee_rate,
            state: Arc::new(RwLock::new(PaperState::default())),
            fail_orders: AtomicUsize::new(0),
            place_calls: AtomicUsize::new(0),
        }
    }

    /// Set the last price of a symbol
    pub async fn set_ticker(&self, ticker: Ticker) {
        let mut state = self.state.write().await;
        state.tickers.insert(ticker.symbol.clone(), ticker);
    }

    /// Shorthand for a ticker with no change or volume
    pub async fn set_price(&self, symbol: &str, price: Decimal) {
        self.set_ticker(Ticker::new(symbol, price)).await;
    }

    /// Replace the listings returned by `get_new_listings`
    pub async fn set_listings(&self, listings: Vec<Listing>) {
        let mut state = self.state.write().await;
        for listing in &listings {
            let info = SymbolInfo {
                symbol: listing.symbol.clone(),
                base_asset: listing.base_asset.clone(),
                quote_asset: listing.quote_asset.clone(),
                status: listing.status.as_str().to_string(),
                min_qty: Decimal::ZERO,
                min_notional: Decimal::ZERO,
            };
            state.symbols.insert(listing.symbol.clone(), info);
        }
        state.listings = listings;
    }

    /// Register trading rules for a symbol
    pub async fn set_symbol_info(&self, info: SymbolInfo) {
        let mut state = self.state.write().await;
        state.symbols.insert(info.symbol.clone(), info);
    }

    /// Register historical bars for a symbol
    pub async fn set_klines(&self, symbol: &str, klines: Vec<Kline>) {
        let mut state = self.state.write().await;
        state.klines.insert(symbol.to_string(), klines);
    }

    /// Seed a free balance
    pub async fn set_balance(&self, asset: &str, free: Decimal) {
        let mut state = self.state.write().await;
        state
            .wallet
            .get_or_insert_with(|| Wallet::new("paper"))
            .set_free(asset, free);
    }

    /// Make the next `count` order placements fail with an exchange error
    pub fn fail_next_orders(&self, count: usize) {
        self.fail_orders.store(count, Ordering::SeqCst);
    }

    /// Number of `place_order` calls, including failed ones
    pub fn place_calls(&self) -> usize {
        self.place_calls.load(Ordering::SeqCst)
    }

    /// Every successfully placed order, in placement order
    pub async fn placed_orders(&self) -> Vec<Order> {
        let state = self.state.read().await;
        state.placed.clone()
    }

    fn take_failure(&self) -> bool {
        self.fail_orders
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn settle(&self, wallet: &mut Wallet, order: &Order) {
        let (base, quote) = parse_symbol_assets(&order.symbol);
        let cost = order.executed_qty * order.avg_fill_price;
        let fee = cost * self.fee_rate;
        match order.side {
            Side::Buy => {
                wallet.adjust_free(&quote, -(cost + fee));
                wallet.adjust_free(&base, order.executed_qty);
            }
            Side::Sell => {
                wallet.adjust_free(&base, -order.executed_qty);
                wallet.adjust_free(&quote, cost - fee);
            }
            Side::Hold => {}
        }
    }
}

#[async_trait]
impl ExchangeClient for PaperExchange {
    async fn place_order(&self, order: &Order) -> Result<Order> {
        self.place_calls.fetch_add(1, Ordering::SeqCst);
        order.validate()?;
        if self.take_failure() {
            return Err(Error::Exchange("simulated order failure".into()));
        }

        let mut state = self.state.write().await;
        let last_price = state.tickers.get(&order.symbol).map(|t| t.price);

        let mut placed = order.clone();
        placed.exchange_id = Some(uuid::Uuid::new_v4().to_string());
        placed.updated_at = Utc::now();

        let fill_price = match order.order_type {
            OrderType::Market => Some(last_price.ok_or_else(|| {
                Error::Exchange(format!("no market price for {}", order.symbol))
            })?),
            OrderType::Limit => {
                let marketable = match (order.side, last_price) {
                    (_, None) => true,
                    (Side::Buy, Some(last)) => order.price >= last,
                    (Side::Sell, Some(last)) => order.price <= last,
                    (Side::Hold, _) => false,
                };
                marketable.then_some(order.price)
            }
        };

        if let Some(price) = fill_price {
            placed.status = OrderStatus::Filled;
            placed.executed_qty = order.quantity;
            placed.avg_fill_price = price;
            let wallet = state.wallet.get_or_insert_with(|| Wallet::new("paper"));
            self.settle(wallet, &placed);
            tracing::info!(
                order_id = %placed.id,
                symbol = %placed.symbol,
                %price,
                "Paper order filled"
            );
        } else {
            tracing::info!(order_id = %placed.id, symbol = %placed.symbol, "Paper order resting");
        }

        if let Some(id) = placed.exchange_id.clone() {
            state.orders.insert(id, placed.clone());
        }
        state.placed.push(placed.clone());
        Ok(placed)
    }

    async fn cancel_order(&self, symbol: &str, exchange_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(exchange_id)
            .filter(|o| o.symbol == symbol)
            .ok_or_else(|| Error::NotFound(format!("order {} on {}", exchange_id, symbol)))?;
        if order.status.is_terminal() {
            return Err(Error::Exchange(format!("order {} already {}", exchange_id, order.status)));
        }
        order.status = OrderStatus::Canceled;
        order.updated_at = Utc::now();
        tracing::info!(%exchange_id, "Paper order cancelled");
        Ok(())
    }

    async fn get_order_status(&self, symbol: &str, exchange_id: &str) -> Result<Order> {
        let state = self.state.read().await;
        state
            .orders
            .get(exchange_id)
            .filter(|o| o.symbol == symbol)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("order {} on {}", exchange_id, symbol)))
    }

    async fn get_open_orders(&self, symbol: &str) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .filter(|o| o.symbol == symbol && !o.status.is_terminal())
            .cloned()
            .collect())
    }

    async fn get_account(&self) -> Result<Wallet> {
        let state = self.state.read().await;
        Ok(state.wallet.clone().unwrap_or_else(|| Wallet::new("paper")))
    }

    async fn get_new_listings(&self) -> Result<Vec<Listing>> {
        let state = self.state.read().await;
        Ok(state.listings.clone())
    }

    async fn get_symbol_info(&self, symbol: &str) -> Result<SymbolInfo> {
        let state = self.state.read().await;
        state
            .symbols
            .get(symbol)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("symbol {}", symbol)))
    }

    async fn get_ticker(&self, symbol: &str) -> Result<Ticker> {
        let state = self.state.read().await;
        state
            .tickers
            .get(symbol)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("ticker for {}", symbol)))
    }

    async fn get_klines(&self, symbol: &str, _interval: &str, limit: usize) -> Result<Vec<Kline>> {
        let state = self.state.read().await;
        let klines = state.klines.get(symbol).cloned().unwrap_or_default();
        let skip = klines.len().saturating_sub(limit);
        Ok(klines.into_iter().skip(skip).collect())
    }

    async fn get_order_book(&self, symbol: &str, depth: usize) -> Result<OrderBookSnapshot> {
        let ticker = self.get_ticker(symbol).await?;
        // synthetic one-tick-wide book around the last price
        let tick = ticker.price * Decimal::new(1, 4);
        let levels = |sign: Decimal| -> Vec<PriceLevel> {
            (1..=depth)
                .map(|i| PriceLevel {
                    price: ticker.price + sign * tick * Decimal::from(i),
                    size: Decimal::ONE,
                })
                .collect()
        };
        Ok(OrderBookSnapshot {
            symbol: symbol.to_string(),
            bids: levels(Decimal::NEGATIVE_ONE),
            asks: levels(Decimal::ONE),
            timestamp: ticker.timestamp,
        })
    }
}
