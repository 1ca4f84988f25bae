//! Run command implementation

use crate::config::Config;
use crate::error::Result;
use crate::execution::{PaperExchange, Ticker};
use crate::executor::StrategyExecutor;
use crate::feed::{JsonLinesFeed, Tick, TickFeed};
use crate::monitor::{Monitor, StrategyStatus};
use crate::plugin::{Capability, PluginRegistry};
use crate::risk;
use crate::signal::{Signal, SignalFilter, SignalProcessor, StatsSnapshot};
use crate::strategy::StrategyRegistry;
use crate::telemetry::PrometheusMetricsPlugin;
use clap::Args;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// How long `finish` waits for queued signals to be processed
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_POLL: Duration = Duration::from_millis(20);

#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON-lines tick file to replay
    #[arg(long)]
    pub ticks: PathBuf,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let pipeline = Pipeline::build(config).await?;
        let mut ticks = JsonLinesFeed::new(&self.ticks).subscribe().await?;

        let mut count = 0usize;
        while let Some(tick) = ticks.recv().await {
            pipeline.feed(&tick).await;
            count += 1;
        }
        tracing::info!(ticks = count, "Tick replay finished");

        let summary = pipeline.finish().await?;
        println!("Replayed {} ticks", count);
        println!(
            "Signals: submitted={} filtered={} dropped={} placed={} failed={}",
            summary.stats.submitted,
            summary.stats.filtered,
            summary.stats.dropped,
            summary.stats.placed,
            summary.stats.failed
        );
        for status in &summary.statuses {
            println!(
                "  {:<20} {:<8} signals={} orders={}{}",
                status.id,
                status.status,
                status.signals_handled,
                status.orders_placed,
                status
                    .last_error
                    .as_deref()
                    .map(|e| format!(" last_error={}", e))
                    .unwrap_or_default()
            );
        }
        Ok(())
    }
}

/// Outcome of a pipeline run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: StatsSnapshot,
    pub statuses: Vec<StrategyStatus>,
}

/// Paper exchange, processor, executor and monitor wired together
pub struct Pipeline {
    pub exchange: Arc<PaperExchange>,
    pub plugins: Arc<PluginRegistry>,
    pub processor: Arc<SignalProcessor>,
    pub executor: Arc<StrategyExecutor>,
    pub monitor: Arc<Monitor>,
    default_price: Decimal,
}

impl Pipeline {
    /// Build and start the pipeline for `config`
    ///
    /// With no `[[strategies]]` configured a single `default` strategy runs.
    pub async fn build(config: &Config) -> Result<Self> {
        let exchange = Arc::new(PaperExchange::new(config.paper.fee_rate));
        for (asset, amount) in &config.paper.balances {
            exchange.set_balance(asset, *amount).await;
        }

        let plugins = Arc::new(PluginRegistry::new());
        plugins
            .register(
                Capability::Filter,
                Arc::new(SignalFilter::new(config.filter.clone())),
            )
            .await?;
        for plugin in risk::builtin_plugins(&config.risk) {
            plugins.register(Capability::Risk, plugin).await?;
        }
        plugins
            .register(Capability::Metrics, Arc::new(PrometheusMetricsPlugin))
            .await?;

        let processor = Arc::new(SignalProcessor::new(
            exchange.clone(),
            plugins.clone(),
            config.processor.clone(),
        ));
        processor.start().await;

        let executor = Arc::new(StrategyExecutor::new(
            exchange.clone(),
            plugins.clone(),
            config.executor.clone(),
        ));
        let monitor = Arc::new(Monitor::new(config.monitor.clone()));
        executor.register_hook(monitor.clone()).await;
        executor.attach_processor(processor.clone()).await;

        let registry = StrategyRegistry::with_defaults().await;
        if config.strategies.is_empty() {
            executor
                .add_strategy("default", registry.create("default").await?)
                .await?;
        }
        for entry in &config.strategies {
            let params = entry.strategy_config()?;
            let mut strategy = registry.create(&entry.kind).await?;
            strategy.initialize(&params)?;
            executor.add_strategy(&entry.id, strategy).await?;
        }
        executor.start_all().await?;

        Ok(Self {
            exchange,
            plugins,
            processor,
            executor,
            monitor,
            default_price: config.paper.default_price,
        })
    }

    /// Price the paper exchange from the tick, then run strategies on it
    pub async fn feed(&self, tick: &Tick) -> Vec<Signal> {
        let price = match tick.data.price() {
            p if p > Decimal::ZERO => p,
            _ => self.default_price,
        };
        self.exchange
            .set_ticker(Ticker {
                volume: tick.data.volume(),
                timestamp: tick.timestamp,
                ..Ticker::new(&tick.symbol, price)
            })
            .await;
        self.executor
            .on_tick(&tick.symbol, tick.timestamp, &tick.data)
            .await
    }

    /// Close open positions, drain queued signals and stop everything
    pub async fn finish(&self) -> Result<RunSummary> {
        let closing = self.executor.close_all_positions().await?;
        for signal in closing {
            if let Err(e) = self.executor.handle_signal(signal).await {
                tracing::warn!(error = %e, "Closing signal not dispatched");
            }
        }

        if tokio::time::timeout(DRAIN_TIMEOUT, self.drain()).await.is_err() {
            tracing::warn!(
                queued = self.processor.queue_len().await,
                "Signal queue not drained before shutdown"
            );
        }

        let stopped = self.executor.stop_all().await;
        self.executor.stop_dispatcher().await;
        self.processor.stop().await;
        stopped?;

        Ok(RunSummary {
            stats: self.processor.stats(),
            statuses: self.monitor.list_statuses().await,
        })
    }

    /// Wait until the queue is empty and the counters stop moving
    async fn drain(&self) {
        let mut last = self.processor.stats();
        loop {
            tokio::time::sleep(DRAIN_POLL).await;
            let current = self.processor.stats();
            if current == last && self.processor.queue_len().await == 0 {
                return;
            }
            last = current;
        }
    }
}
