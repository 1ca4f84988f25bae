//! Tick feed module
//!
//! Market data is pushed into the core as [`Tick`] values. The core does not
//! acquire data itself; [`JsonLinesFeed`] replays recorded ticks from disk.

mod replay;
mod types;

pub use replay::JsonLinesFeed;
pub use types::{Tick, TickData};

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Trait for tick feed implementations
#[async_trait]
pub trait TickFeed: Send + Sync {
    /// Subscribe to tick updates
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<Tick>>;
}
