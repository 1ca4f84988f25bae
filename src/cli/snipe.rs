//! Snipe command implementation

use crate::config::Config;
use crate::execution::PaperExchange;
use crate::market::{CoinStatus, InMemoryCoinRepository, Listing};
use crate::sniper::{ExchangeSniperService, SniperConfig, SniperController, SniperService};
use clap::Args;
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct SnipeArgs {
    /// Symbol to buy, e.g. NEWUSDT
    pub symbol: String,

    /// Quote amount to spend (overrides sniper.max_buy_amount)
    #[arg(long)]
    pub max_buy_amount: Option<Decimal>,

    /// Highest acceptable price (overrides sniper.max_price_per_token)
    #[arg(long)]
    pub max_price: Option<Decimal>,

    /// Last price seeded on the paper exchange (defaults to paper.default_price)
    #[arg(long)]
    pub price: Option<Decimal>,
}

impl SnipeArgs {
    /// Sniper settings with the command-line overrides applied
    pub fn sniper_config(&self, base: &SniperConfig) -> SniperConfig {
        let mut config = base.clone();
        if let Some(amount) = self.max_buy_amount {
            config.max_buy_amount = amount;
        }
        if let Some(price) = self.max_price {
            config.max_price_per_token = price;
        }
        config
    }

    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let symbol = self.symbol.to_ascii_uppercase();
        let exchange = Arc::new(PaperExchange::new(config.paper.fee_rate));
        exchange
            .set_listings(vec![Listing::new(&symbol, CoinStatus::Trading)])
            .await;
        exchange
            .set_price(&symbol, self.price.unwrap_or(config.paper.default_price))
            .await;
        for (asset, amount) in &config.paper.balances {
            exchange.set_balance(asset, *amount).await;
        }

        let sniper_config = self.sniper_config(&config.sniper);
        sniper_config.validate()?;
        let service: Arc<dyn SniperService> =
            Arc::new(ExchangeSniperService::new(exchange, sniper_config));
        let controller =
            SniperController::new(Some(service), Arc::new(InMemoryCoinRepository::new())).await;

        let order = controller.execute_snipe(&symbol).await?;
        println!(
            "Sniped {}: {} {} @ {} ({})",
            order.symbol, order.side, order.executed_qty, order.avg_fill_price, order.status
        );
        controller.stop().await?;
        Ok(())
    }
}
