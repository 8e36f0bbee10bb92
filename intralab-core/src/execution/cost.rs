//! Transaction costs from traded weight, in return space.
//!
//! `cost(Δw) = |Δw| * (half_spread_bps + impact_bps * f(|Δw|)) / 1e4`
//! where `f` is the configured impact curve. Costs are a fraction of NAV,
//! deducted from the bar's gross PnL. No minimum-ticket fee: zero trade is
//! exactly zero cost.

use crate::config::{BacktestConfig, ImpactCurve};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub half_spread_bps: f64,
    pub impact_bps: f64,
    pub impact_curve: ImpactCurve,
}

impl CostModel {
    pub fn new(half_spread_bps: f64, impact_bps: f64, impact_curve: ImpactCurve) -> Self {
        Self {
            half_spread_bps,
            impact_bps,
            impact_curve,
        }
    }

    pub fn from_config(config: &BacktestConfig) -> Self {
        Self::new(config.half_spread_bps, config.impact_bps, config.impact_curve)
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0, ImpactCurve::Constant)
    }

    /// Cost of one weight change, as a fraction of NAV. Always >= 0.
    pub fn trade_cost(&self, delta_weight: f64) -> f64 {
        let dw = delta_weight.abs();
        if dw == 0.0 {
            return 0.0;
        }
        let impact = self.impact_bps
            * match self.impact_curve {
                ImpactCurve::Constant => 1.0,
                ImpactCurve::Linear => dw,
                ImpactCurve::SquareRoot => dw.sqrt(),
            };
        dw * (self.half_spread_bps + impact) / 1e4
    }

    /// Total cost of a cross-section of weight changes.
    pub fn bar_cost(&self, deltas: &[f64]) -> f64 {
        deltas.iter().map(|&dw| self.trade_cost(dw)).sum()
    }
}
