//! CLI interface for strategy-core
//!
//! Provides subcommands for:
//! - `run`: Replay a tick file through the strategy pipeline
//! - `snipe`: One-off snipe against the paper exchange
//! - `strategies`: List registered strategy kinds
//! - `config`: Show the effective configuration

mod run;
mod snipe;

pub use run::{Pipeline, RunArgs, RunSummary};
pub use snipe::SnipeArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "strategy-core")]
#[command(about = "Strategy execution core and new-coin sniper for a crypto trading bot")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay ticks through the configured strategies on the paper exchange
    Run(RunArgs),
    /// Snipe a symbol once on the paper exchange
    Snipe(SnipeArgs),
    /// List registered strategy kinds
    Strategies,
    /// Show the effective configuration
    Config,
}
