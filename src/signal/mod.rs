//! Signal module
//!
//! Signal data model and the signal processor that turns signals into
//! exchange orders.

mod filter;
mod processor;
mod queue;
mod types;

pub use filter::{FilterConfig, FilterResult, RejectReason, SignalFilter};
pub use processor::{
    build_order, ProcessorConfig, ProcessorStats, SignalProcessor, StatsSnapshot, Submission,
};
pub use queue::PriorityQueue;
pub use types::{Payload, Side, Signal};

pub(crate) use types::{pct, to_decimal};
