//! strategy-core: strategy execution core and new-coin sniper for a crypto
//! trading bot
//!
//! This library provides the core components for:
//! - Technical indicators over price and volume series
//! - Pluggable tick-driven strategies and their registry
//! - Prioritized signal processing with filter, routing and risk plugins
//! - A strategy executor with event hooks and a monitor
//! - New-listing detection and the sniper control loop
//! - Rule-driven auto-buys
//! - A paper exchange for replay and tests
//! - Structured logging and Prometheus metrics

pub mod autobuy;
pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod executor;
pub mod feed;
pub mod indicators;
pub mod market;
pub mod monitor;
pub mod plugin;
pub mod risk;
pub mod signal;
pub mod sniper;
pub mod strategy;
pub mod telemetry;
pub mod wallet;
