//! RSI, Bollinger Bands and ATR

use super::{check_period, sma};
use crate::error::{Error, Result};

/// Bollinger band series, each of length `len - period + 1`
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Relative strength index with Wilder smoothing
///
/// Returns `len - period` values. A window with no losses yields 100.
pub fn rsi(data: &[f64], period: usize) -> Result<Vec<f64>> {
    check_period(data.len(), period, period + 1)?;

    let (gains, losses): (Vec<f64>, Vec<f64>) = data
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            if change > 0.0 {
                (change, 0.0)
            } else {
                (0.0, -change)
            }
        })
        .unzip();

    let p = period as f64;
    let mut avg_gain = gains[..period].iter().sum::<f64>() / p;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / p;

    let mut result = Vec::with_capacity(data.len() - period);
    result.push(rsi_value(avg_gain, avg_loss));

    for i in period..gains.len() {
        avg_gain = (avg_gain * (p - 1.0) + gains[i]) / p;
        avg_loss = (avg_loss * (p - 1.0) + losses[i]) / p;
        result.push(rsi_value(avg_gain, avg_loss));
    }

    Ok(result)
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Bollinger bands: SMA middle band +/- `k` population standard deviations
pub fn bollinger_bands(data: &[f64], period: usize, k: f64) -> Result<BollingerBands> {
    let middle = sma(data, period)?;

    let mut upper = Vec::with_capacity(middle.len());
    let mut lower = Vec::with_capacity(middle.len());
    for (i, mean) in middle.iter().enumerate() {
        let variance = data[i..i + period]
            .iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>()
            / period as f64;
        let band = k * variance.sqrt();
        upper.push(mean + band);
        lower.push(mean - band);
    }

    Ok(BollingerBands {
        upper,
        middle,
        lower,
    })
}

/// Average true range
///
/// Returns `len - period + 1` values. Requires strictly more points than
/// `period` so at least one true range uses a previous close.
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Result<Vec<f64>> {
    if high.len() != low.len() || high.len() != close.len() {
        return Err(Error::InvalidArg("high, low and close must have the same length".into()));
    }
    check_period(high.len(), period, period + 1)?;

    let mut tr = Vec::with_capacity(high.len());
    tr.push(high[0] - low[0]);
    for i in 1..high.len() {
        let range = high[i] - low[i];
        let up = (high[i] - close[i - 1]).abs();
        let down = (low[i] - close[i - 1]).abs();
        tr.push(range.max(up).max(down));
    }

    let p = period as f64;
    let mut result = Vec::with_capacity(high.len() - period + 1);
    let mut prev = tr[..period].iter().sum::<f64>() / p;
    result.push(prev);
    for value in &tr[period..] {
        prev = (prev * (p - 1.0) + value) / p;
        result.push(prev);
    }

    Ok(result)
}
