//! Technical indicator library
//!
//! Pure functions over ordered price series. Every function validates its
//! inputs and returns `Error::InvalidArg` instead of producing partial output.
//! Output length is documented per function and never exceeds the input.

mod moving_average;
mod oscillators;

pub use moving_average::{ema, macd, sma, Macd};
pub use oscillators::{atr, bollinger_bands, rsi, BollingerBands};

use crate::error::{Error, Result};

/// Validate a period against the available data length
pub(crate) fn check_period(len: usize, period: usize, min_len: usize) -> Result<()> {
    if period == 0 {
        return Err(Error::InvalidArg("period must be positive".into()));
    }
    if len < min_len {
        return Err(Error::InvalidArg(format!(
            "not enough data points: have {}, need {}",
            len, min_len
        )));
    }
    Ok(())
}
