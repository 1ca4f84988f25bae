//! Moving averages: SMA, EMA and MACD

use super::check_period;
use crate::error::{Error, Result};

/// MACD output, all three series aligned to the right edge of the input
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    /// Fast EMA minus slow EMA, length `len - slow + 1`
    pub macd: Vec<f64>,
    /// EMA of the MACD line
    pub signal: Vec<f64>,
    /// MACD line minus signal line, same length as `signal`
    pub histogram: Vec<f64>,
}

/// Simple moving average
///
/// Returns `len - period + 1` values; value `i` is the mean of
/// `data[i..i + period]`.
pub fn sma(data: &[f64], period: usize) -> Result<Vec<f64>> {
    check_period(data.len(), period, period)?;

    let mut result = Vec::with_capacity(data.len() - period + 1);
    let mut sum: f64 = data[..period].iter().sum();
    result.push(sum / period as f64);

    for i in period..data.len() {
        sum += data[i] - data[i - period];
        result.push(sum / period as f64);
    }

    Ok(result)
}

/// Exponential moving average
///
/// Seeded with the SMA of the first `period` points, then
/// `e[i] = (x - e[i-1]) * k + e[i-1]` with `k = 2 / (period + 1)`.
pub fn ema(data: &[f64], period: usize) -> Result<Vec<f64>> {
    check_period(data.len(), period, period)?;

    let k = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(data.len() - period + 1);
    let seed = data[..period].iter().sum::<f64>() / period as f64;
    result.push(seed);

    let mut prev = seed;
    for &x in &data[period..] {
        prev = (x - prev) * k + prev;
        result.push(prev);
    }

    Ok(result)
}

/// Moving average convergence/divergence
pub fn macd(data: &[f64], fast: usize, slow: usize, signal: usize) -> Result<Macd> {
    if fast == 0 || slow == 0 || signal == 0 {
        return Err(Error::InvalidArg("periods must be positive".into()));
    }
    if fast >= slow {
        return Err(Error::InvalidArg(format!(
            "fast period ({}) must be less than slow period ({})",
            fast, slow
        )));
    }
    check_period(data.len(), slow, slow)?;

    let fast_ema = ema(data, fast)?;
    let slow_ema = ema(data, slow)?;

    // fast EMA is longer; trim its left edge so both end on the last input
    let offset = fast_ema.len() - slow_ema.len();
    let macd_line: Vec<f64> = slow_ema
        .iter()
        .enumerate()
        .map(|(i, s)| fast_ema[i + offset] - s)
        .collect();

    let signal_line = ema(&macd_line, signal)?;
    let offset = macd_line.len() - signal_line.len();
    let histogram = signal_line
        .iter()
        .enumerate()
        .map(|(i, s)| macd_line[i + offset] - s)
        .collect();

    Ok(Macd {
        macd: macd_line,
        signal: signal_line,
        histogram,
    })
}
