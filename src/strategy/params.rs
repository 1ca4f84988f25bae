//! Typed strategy parameters
//!
//! Configuration arrives as a free-form table (TOML or JSON). It is parsed
//! once at the boundary into the parameter struct of the requested strategy
//! kind; unknown keys and mistyped values are rejected there.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters for one of the built-in strategies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StrategyConfig {
    Default(CrossoverParams),
    #[serde(rename = "newcoin")]
    NewCoin(NewCoinParams),
    #[serde(rename = "volumespike")]
    VolumeSpike(VolumeSpikeParams),
    Breakout(BreakoutParams),
}

impl StrategyConfig {
    /// Factory name of the strategy these parameters belong to
    pub fn kind(&self) -> &'static str {
        match self {
            StrategyConfig::Default(_) => "default",
            StrategyConfig::NewCoin(_) => "newcoin",
            StrategyConfig::VolumeSpike(_) => "volumespike",
            StrategyConfig::Breakout(_) => "breakout",
        }
    }

    /// Default parameters for a strategy kind
    pub fn default_for(kind: &str) -> Result<Self> {
        Self::parse(kind, Value::Null)
    }

    /// Parse a parameter table for `kind`; `null` yields the defaults
    pub fn parse(kind: &str, params: Value) -> Result<Self> {
        let params = match params {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let config = match kind {
            "default" => StrategyConfig::Default(serde_json::from_value(params)?),
            "newcoin" => StrategyConfig::NewCoin(serde_json::from_value(params)?),
            "volumespike" => StrategyConfig::VolumeSpike(serde_json::from_value(params)?),
            "breakout" => StrategyConfig::Breakout(serde_json::from_value(params)?),
            other => return Err(Error::NotFound(format!("strategy kind {}", other))),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        match self {
            StrategyConfig::Default(p) => {
                if p.short_period == 0 {
                    return Err(Error::InvalidArg("short_period must be positive".into()));
                }
                if p.short_period >= p.long_period {
                    return Err(Error::InvalidArg(format!(
                        "short_period ({}) must be less than long_period ({})",
                        p.short_period, p.long_period
                    )));
                }
                Ok(())
            }
            StrategyConfig::NewCoin(p) => {
                check_band(p.min_price, p.max_price)?;
                check_exits(p.take_profit_percent, p.stop_loss_percent)
            }
            StrategyConfig::VolumeSpike(p) => {
                check_band(p.min_price, p.max_price)?;
                check_exits(p.take_profit_percent, p.stop_loss_percent)?;
                if p.lookback_period == 0 {
                    return Err(Error::InvalidArg("lookback_period must be positive".into()));
                }
                if p.volume_threshold_percent <= 0.0 {
                    return Err(Error::InvalidArg(
                        "volume_threshold_percent must be positive".into(),
                    ));
                }
                Ok(())
            }
            StrategyConfig::Breakout(p) => {
                check_band(p.min_price, p.max_price)?;
                check_exits(p.take_profit_percent, p.stop_loss_percent)?;
                if p.range_period < 2 {
                    return Err(Error::InvalidArg("range_period must be at least 2".into()));
                }
                if p.confirmation_periods == 0 {
                    return Err(Error::InvalidArg("confirmation_periods must be positive".into()));
                }
                Ok(())
            }
        }
    }
}

fn check_band(min_price: f64, max_price: f64) -> Result<()> {
    if min_price < 0.0 || max_price <= min_price {
        return Err(Error::InvalidArg(format!("invalid price band [{}, {}]", min_price, max_price)));
    }
    Ok(())
}

fn check_exits(take_profit: f64, stop_loss: f64) -> Result<()> {
    if take_profit <= 0.0 || stop_loss <= 0.0 {
        return Err(Error::InvalidArg(
            "take_profit_percent and stop_loss_percent must be positive".into(),
        ));
    }
    Ok(())
}

/// Moving-average crossover parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrossoverParams {
    pub short_period: usize,
    pub long_period: usize,
}

impl Default for CrossoverParams {
    fn default() -> Self {
        Self {
            short_period: 10,
            long_period: 30,
        }
    }
}

/// New-listing entry parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NewCoinParams {
    pub min_volume: f64,
    pub min_price: f64,
    pub max_price: f64,
    /// Minutes to wait after first sighting before buying
    pub entry_delay_minutes: i64,
    pub stop_loss_percent: f64,
    pub take_profit_percent: f64,
    /// Percent of portfolio per position (informational for the sizer)
    pub position_size: f64,
    /// Coins first seen longer ago than this are forgotten
    pub max_age_hours: i64,
}

impl Default for NewCoinParams {
    fn default() -> Self {
        Self {
            min_volume: 1000.0,
            min_price: 0.00001,
            max_price: 10.0,
            entry_delay_minutes: 5,
            stop_loss_percent: 5.0,
            take_profit_percent: 10.0,
            position_size: 1.0,
            max_age_hours: 24,
        }
    }
}

/// Volume spike parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VolumeSpikeParams {
    /// Required increase over the lookback average, in percent
    pub volume_threshold_percent: f64,
    pub min_volume: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub lookback_period: usize,
    pub stop_loss_percent: f64,
    pub take_profit_percent: f64,
    pub position_size: f64,
    pub exit_after_bars: u32,
}

impl Default for VolumeSpikeParams {
    fn default() -> Self {
        Self {
            volume_threshold_percent: 200.0,
            min_volume: 5000.0,
            min_price: 0.1,
            max_price: 1000.0,
            lookback_period: 5,
            stop_loss_percent: 5.0,
            take_profit_percent: 15.0,
            position_size: 2.0,
            exit_after_bars: 20,
        }
    }
}

/// Range breakout parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BreakoutParams {
    /// Closes used for support and resistance
    pub range_period: usize,
    /// Minimum range width relative to its midpoint, in percent
    pub min_range_percent: f64,
    /// Distance above resistance that counts as a breakout, in percent
    pub breakout_percent: f64,
    pub min_volume: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub stop_loss_percent: f64,
    pub take_profit_percent: f64,
    pub position_size: f64,
    pub exit_after_bars: u32,
    /// Consecutive ticks above the breakout level before buying
    pub confirmation_periods: u32,
}

impl Default for BreakoutParams {
    fn default() -> Self {
        Self {
            range_period: 20,
            min_range_percent: 5.0,
            breakout_percent: 1.0,
            min_volume: 5000.0,
            min_price: 0.1,
            max_price: 1000.0,
            stop_loss_percent: 5.0,
            take_profit_percent: 15.0,
            position_size: 2.0,
            exit_after_bars: 20,
            confirmation_periods: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_defaults_per_kind() {
        let config = StrategyConfig::default_for("volumespike").unwrap();
        assert_eq!(config.kind(), "volumespike");
        assert_eq!(
            config,
            StrategyConfig::VolumeSpike(VolumeSpikeParams::default())
        );

        let StrategyConfig::Breakout(p) = StrategyConfig::default_for("breakout").unwrap() else {
            panic!("expected breakout params");
        };
        assert_eq!(p.range_period, 20);
        assert_eq!(p.confirmation_periods, 2);
    }

    #[test]
    fn test_partial_params_keep_defaults() {
        let config =
            StrategyConfig::parse("default", json!({"short_period": 5})).unwrap();
        assert_eq!(
            config,
            StrategyConfig::Default(CrossoverParams {
                short_period: 5,
                long_period: 30
            })
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = StrategyConfig::parse("default", json!({"shortperiod": 5})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArg);
    }

    #[test]
    fn test_mistyped_value_rejected() {
        let err =
            StrategyConfig::parse("volumespike", json!({"lookback_period": "five"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArg);
    }

    #[test]
    fn test_unknown_kind() {
        let err = StrategyConfig::default_for("martingale").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(StrategyConfig::parse("default", json!({"short_period": 30})).is_err());
        assert!(StrategyConfig::parse("breakout", json!({"confirmation_periods": 0})).is_err());
        assert!(
            StrategyConfig::parse("newcoin", json!({"min_price": 5.0, "max_price": 1.0})).is_err()
        );
    }

    #[test]
    fn test_tagged_round_trip() {
        let config = StrategyConfig::default_for("newcoin").unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["kind"], "newcoin");
        let back: StrategyConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
