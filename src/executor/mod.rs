//! Executor module
//!
//! The strategy executor owns live strategies, feeds them ticks and fans
//! their signals and orders out to event hooks and metrics plugins on
//! dedicated dispatcher tasks.

mod dispatch;
mod hooks;
mod runner;

pub use hooks::{EventHook, StrategyState};
pub use runner::{ExecutorConfig, StrategyExecutor};
