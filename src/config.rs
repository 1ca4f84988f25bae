//! Configuration types for strategy-core

use crate::autobuy::AutoBuyConfig;
use crate::executor::ExecutorConfig;
use crate::market::DetectorConfig;
use crate::monitor::MonitorConfig;
use crate::risk::RiskLimits;
use crate::signal::{FilterConfig, ProcessorConfig};
use crate::sniper::SniperConfig;
use crate::strategy::StrategyConfig;
use crate::telemetry::LogFormat;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;

/// Root configuration structure
///
/// Every section is optional; missing sections take their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub sniper: SniperConfig,
    #[serde(default)]
    pub autobuy: AutoBuyConfig,
    #[serde(default)]
    pub risk: RiskLimits,
    #[serde(default)]
    pub paper: PaperConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub strategies: Vec<StrategyEntry>,
}

/// Paper exchange configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaperConfig {
    /// Fee charged on each fill, as a fraction of notional
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Decimal,
    /// Last price seeded for symbols first seen in a tick file
    #[serde(default = "default_price")]
    pub default_price: Decimal,
    /// Starting free balances, asset to amount
    #[serde(default = "default_balances")]
    pub balances: HashMap<String, Decimal>,
}

fn default_fee_rate() -> Decimal {
    dec!(0.001)
}
fn default_price() -> Decimal {
    dec!(1)
}
fn default_balances() -> HashMap<String, Decimal> {
    HashMap::from([("USDT".to_string(), dec!(10000))])
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            fee_rate: default_fee_rate(),
            default_price: default_price(),
            balances: default_balances(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Prometheus listener port; 0 disables the exporter
    #[serde(default)]
    pub metrics_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: 0,
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

/// A strategy instance to run
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyEntry {
    /// Instance id used by the executor and monitor
    pub id: String,
    /// Factory name, e.g. `default` or `newcoin`
    pub kind: String,
    /// Free-form parameter table, parsed against `kind`
    #[serde(default)]
    pub params: toml::Table,
}

impl StrategyEntry {
    /// Typed parameters for this entry
    pub fn strategy_config(&self) -> crate::error::Result<StrategyConfig> {
        let params = serde_json::to_value(&self.params)?;
        StrategyConfig::parse(&self.kind, params)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
