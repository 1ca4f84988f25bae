//! Error types for the strategy execution core

use thiserror::Error;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the execution core
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input (bad period, unknown side, unknown config key)
    #[error("Invalid argument: {0}")]
    InvalidArg(String),

    /// Unknown strategy id, symbol or rule
    #[error("Not found: {0}")]
    NotFound(String),

    /// Id already registered
    #[error("Already exists: {0}")]
    Duplicate(String),

    /// Network, auth or business failure reported by the exchange client
    #[error("Exchange error: {0}")]
    Exchange(String),

    /// A risk plugin or risk constraint vetoed the order
    #[error("Risk rejected: {0}")]
    RiskRejected(String),

    /// Rule evaluation found nothing to do
    #[error("Market condition not met: {0}")]
    MarketConditionNotMet(String),

    /// Balance pre-check failed
    #[error("Insufficient funds: need {required} {asset}, have {available}")]
    InsufficientFunds {
        asset: String,
        required: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    /// Operation canceled before completion
    #[error("Canceled: {0}")]
    Canceled(String),

    /// Deadline elapsed
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    /// Bounded queue rejected the item
    #[error("Queue full (capacity {0})")]
    QueueFull(usize),

    /// Sniper use case used without a sniper service
    #[error("Sniper service not initialized")]
    SniperNotInitialized,

    /// Combined failure of a fan-out operation
    #[error("{} operation(s) failed: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<Error>),
}

/// Error classification used for matching without caring about messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArg,
    NotFound,
    Duplicate,
    Exchange,
    RiskRejected,
    MarketConditionNotMet,
    InsufficientFunds,
    Canceled,
    QueueFull,
    SniperNotInitialized,
    Multiple,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArg(_) => ErrorKind::InvalidArg,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Duplicate(_) => ErrorKind::Duplicate,
            Error::Exchange(_) => ErrorKind::Exchange,
            Error::RiskRejected(_) => ErrorKind::RiskRejected,
            Error::MarketConditionNotMet(_) => ErrorKind::MarketConditionNotMet,
            Error::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Error::Canceled(_) | Error::Timeout(_) => ErrorKind::Canceled,
            Error::QueueFull(_) => ErrorKind::QueueFull,
            Error::SniperNotInitialized => ErrorKind::SniperNotInitialized,
            Error::Multiple(_) => ErrorKind::Multiple,
        }
    }

    /// Check if a caller may retry the operation that produced this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Exchange(_) | Error::Timeout(_))
    }

    /// Collapse a list of errors into a single result
    pub fn from_many(mut errors: Vec<Error>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Error::Multiple(errors)),
        }
    }
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidArg(e.to_string())
    }
}
