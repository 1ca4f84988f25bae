use clap::Parser;
use strategy_core::cli::{Cli, Commands};
use strategy_core::config::Config;
use strategy_core::strategy::StrategyRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using default configuration");
            Config::default()
        }
    };

    // Initialize telemetry
    let _telemetry = strategy_core::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(ticks = %args.ticks.display(), "Starting tick replay");
            args.execute(&config).await?;
        }
        Commands::Snipe(args) => {
            tracing::info!(symbol = %args.symbol, "Starting one-off snipe");
            args.execute(&config).await?;
        }
        Commands::Strategies => {
            let registry = StrategyRegistry::with_defaults().await;
            println!("Registered strategies:");
            for name in registry.list().await {
                println!("  {}", name);
            }
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Processor: queue_capacity={}, order_timeout_ms={}",
                config.processor.queue_capacity, config.processor.order_timeout_ms
            );
            println!(
                "  Executor: signal_buffer={}, order_buffer={}",
                config.executor.signal_buffer, config.executor.order_buffer
            );
            println!(
                "  Detector: poll_interval_secs={}",
                config.detector.poll_interval_secs
            );
            println!(
                "  Sniper: max_buy_amount={}, max_price_per_token={}, \
                 max_concurrent_orders={}, take_profit={}, auto_snipe={}",
                config.sniper.max_buy_amount,
                config.sniper.max_price_per_token,
                config.sniper.max_concurrent_orders,
                config.sniper.enable_take_profit,
                config.sniper.auto_snipe
            );
            println!(
                "  AutoBuy: evaluation_interval_secs={}",
                config.autobuy.evaluation_interval_secs
            );
            println!(
                "  Risk: max_order_value={}, blocked={:?}",
                config.risk.max_order_value, config.risk.blocked_symbols
            );
            println!("  Paper: fee_rate={}", config.paper.fee_rate);
            for entry in &config.strategies {
                println!("  Strategy: {} ({})", entry.id, entry.kind);
            }
        }
    }

    Ok(())
}
