//! Serializable backtest configuration with fail-fast validation.
//!
//! Every parameter the pipeline consumes lives here. `BacktestConfig::validate`
//! runs before any simulation; an invalid configuration never reaches the
//! engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Configuration errors, raised before any simulation runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("signal lookback must be > 0")]
    ZeroLookback,

    #[error("q_in ({q_in}) must be strictly less than q_out ({q_out})")]
    QuantilesNotOrdered { q_in: f64, q_out: f64 },

    #[error("quantile {name} = {value} outside [0, 1]")]
    QuantileOutOfRange { name: &'static str, value: f64 },

    #[error("{name} must be >= 0, got {value}")]
    NegativeParameter { name: &'static str, value: f64 },

    #[error("gross exposure target must be > 0, got {0}")]
    NonPositiveGross(f64),

    #[error("per-name weight cap must be > 0, got {0}")]
    NonPositiveMaxWeight(f64),

    #[error("rebalance cadence must be >= 1 bar")]
    ZeroRebalanceCadence,
}

/// Orientation of the cross-sectional signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalMode {
    /// K-bar log return; recent winners are attractive longs.
    #[default]
    Momentum,
    /// Sign-inverted K-bar log return; recent losers are attractive longs.
    MeanRev,
    /// Negative z-score of close minus incremental VWAP (requires volumes).
    VwapRev,
}

/// Execution throttling policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecMode {
    /// Per-bar weight change capped at `step_bps`. With `pre_band_bps > 0`
    /// a no-trade band is applied to the target before rate limiting.
    Ratelimit { step_bps: f64, pre_band_bps: f64 },
    /// No trade while |target - realized| < `band_bps`; otherwise jump fully.
    Band { band_bps: f64 },
    /// Realized weight snaps to the target rounded to the nearest grid step.
    Grid { grid_bps: f64 },
}

impl Default for ExecMode {
    fn default() -> Self {
        Self::Ratelimit {
            step_bps: 10.0,
            pre_band_bps: 0.0,
        }
    }
}

/// Shape of the market-impact term in the cost model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactCurve {
    /// Impact independent of trade size: flat bps per unit turnover.
    #[default]
    Constant,
    /// Impact proportional to |Δw|.
    Linear,
    /// Impact proportional to sqrt(|Δw|).
    SquareRoot,
}

/// How weights are allocated within the membership set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    #[default]
    Equal,
    ScoreProportional,
}

/// Full configuration for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Signal orientation.
    pub signal_mode: SignalMode,
    /// Signal lookback horizon K, in bars.
    pub lookback: usize,
    /// Entry quantile: enter long at rank >= 1 - q_in, short at rank <= q_in.
    pub q_in: f64,
    /// Exit quantile: stay long while rank >= 1 - q_out (q_in < q_out).
    pub q_out: f64,
    /// Target gross leverage (sum of |weights|).
    pub gross: f64,
    /// Per-name absolute weight cap, fraction of NAV.
    pub max_weight: f64,
    /// Force net signed exposure ~ 0 by normalizing books independently.
    pub market_neutral: bool,
    /// De-mean scores within sector buckets before ranking.
    pub sector_neutral: bool,
    /// Symbol -> sector mapping; only consulted when `sector_neutral`.
    pub sectors: HashMap<String, String>,
    /// Weight allocation within the membership set.
    pub weighting: Weighting,
    /// Execution throttling policy.
    pub exec: ExecMode,
    /// Rebalance cadence in bars (per day); targets carried between updates.
    pub rebalance_every: usize,
    /// Half-spread cost in bps per unit turnover.
    pub half_spread_bps: f64,
    /// Impact cost coefficient in bps.
    pub impact_bps: f64,
    /// Impact curve shape.
    pub impact_curve: ImpactCurve,
    /// Bars to skip at the start of each day (membership held at zero).
    pub skip_first_bars: usize,
    /// Bars before each close on which positions are flattened. 0 disables.
    pub eod_flatten_bars: usize,
    /// Bars per day override for annualization; 0 = infer from timestamps.
    pub bars_per_day: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            signal_mode: SignalMode::Momentum,
            lookback: 6,
            q_in: 0.30,
            q_out: 0.55,
            gross: 1.0,
            max_weight: 0.05,
            market_neutral: true,
            sector_neutral: false,
            sectors: HashMap::new(),
            weighting: Weighting::Equal,
            exec: ExecMode::default(),
            rebalance_every: 6,
            half_spread_bps: 1.0,
            impact_bps: 0.5,
            impact_curve: ImpactCurve::Constant,
            skip_first_bars: 0,
            eod_flatten_bars: 0,
            bars_per_day: 0,
        }
    }
}

impl BacktestConfig {
    /// Validate every parameter. Called by the engine before simulating.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookback == 0 {
            return Err(ConfigError::ZeroLookback);
        }
        for (name, value) in [("q_in", self.q_in), ("q_out", self.q_out)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::QuantileOutOfRange { name, value });
            }
        }
        if self.q_in >= self.q_out {
            return Err(ConfigError::QuantilesNotOrdered {
                q_in: self.q_in,
                q_out: self.q_out,
            });
        }
        if self.gross <= 0.0 {
            return Err(ConfigError::NonPositiveGross(self.gross));
        }
        if self.max_weight <= 0.0 {
            return Err(ConfigError::NonPositiveMaxWeight(self.max_weight));
        }
        if self.rebalance_every == 0 {
            return Err(ConfigError::ZeroRebalanceCadence);
        }
        let named = [
            ("half_spread_bps", self.half_spread_bps),
            ("impact_bps", self.impact_bps),
        ];
        for (name, value) in named {
            if value < 0.0 {
                return Err(ConfigError::NegativeParameter { name, value });
            }
        }
        match self.exec {
            ExecMode::Ratelimit {
                step_bps,
                pre_band_bps,
            } => {
                for (name, value) in [("step_bps", step_bps), ("pre_band_bps", pre_band_bps)] {
                    if value < 0.0 {
                        return Err(ConfigError::NegativeParameter { name, value });
                    }
                }
            }
            ExecMode::Band { band_bps } => {
                if band_bps < 0.0 {
                    return Err(ConfigError::NegativeParameter {
                        name: "band_bps",
                        value: band_bps,
                    });
                }
            }
            ExecMode::Grid { grid_bps } => {
                if grid_bps < 0.0 {
                    return Err(ConfigError::NegativeParameter {
                        name: "grid_bps",
                        value: grid_bps,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(BacktestConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_lookback_rejected() {
        let cfg = BacktestConfig {
            lookback: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroLookback)));
    }

    #[test]
    fn unordered_quantiles_rejected() {
        let cfg = BacktestConfig {
            q_in: 0.55,
            q_out: 0.30,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::QuantilesNotOrdered { .. })
        ));
    }

    #[test]
    fn equal_quantiles_rejected() {
        let cfg = BacktestConfig {
            q_in: 0.40,
            q_out: 0.40,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn quantile_out_of_range_rejected() {
        let cfg = BacktestConfig {
            q_in: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::QuantileOutOfRange { name: "q_in", .. })
        ));
    }

    #[test]
    fn negative_step_rejected() {
        let cfg = BacktestConfig {
            exec: ExecMode::Ratelimit {
                step_bps: -1.0,
                pre_band_bps: 0.0,
            },
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NegativeParameter {
                name: "step_bps",
                ..
            })
        ));
    }

    #[test]
    fn negative_band_rejected() {
        let cfg = BacktestConfig {
            exec: ExecMode::Band { band_bps: -5.0 },
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_cadence_rejected() {
        let cfg = BacktestConfig {
            rebalance_every: 0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroRebalanceCadence)
        ));
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = BacktestConfig::default();
        let text = toml::to_string(&cfg).unwrap();
        let back: BacktestConfig = toml::from_str(&text).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg: BacktestConfig = toml::from_str(
            r#"
            lookback = 3
            q_in = 0.2
            q_out = 0.4
            "#,
        )
        .unwrap();
        assert_eq!(cfg.lookback, 3);
        assert_eq!(cfg.rebalance_every, 6);
        assert!(cfg.validate().is_ok());
    }
}
