//! SignalEngine — cross-sectional ranking scores per symbol per bar.
//!
//! The momentum/mean-reversion score at bar t is the K-bar log close return
//! `ln(close[t]) - ln(close[t-K])`. Bars with fewer than K prior observations
//! produce NaN for that symbol — exclusion, not zero-fill. This is the
//! primary look-ahead guard: a score at t depends on closes up to and
//! including t, never beyond.

use crate::config::{BacktestConfig, SignalMode};
use crate::domain::PricePanel;
use crate::features::vwap_zscore;

/// Cross-sectional score matrix, row-major `n_bars * n_symbols`.
///
/// NaN means "no score": the symbol is invisible to membership ranking at
/// that bar.
#[derive(Debug, Clone)]
pub struct ScoreMatrix {
    pub scores: Vec<f64>,
    pub n_symbols: usize,
}

impl ScoreMatrix {
    /// The cross-section of scores at bar `t`.
    pub fn row(&self, t: usize) -> &[f64] {
        &self.scores[t * self.n_symbols..(t + 1) * self.n_symbols]
    }
}

/// Compute the score matrix for the configured signal mode.
///
/// Higher score = more attractive long, in every mode.
pub fn compute_scores(panel: &PricePanel, config: &BacktestConfig) -> ScoreMatrix {
    let k = config.lookback;
    let (n, w) = (panel.n_bars(), panel.n_symbols());
    let mut scores = vec![f64::NAN; n * w];

    match config.signal_mode {
        SignalMode::Momentum | SignalMode::MeanRev => {
            let sign = match config.signal_mode {
                SignalMode::Momentum => 1.0,
                _ => -1.0,
            };
            for t in k..n {
                for s in 0..w {
                    let (p0, p1) = (panel.close(t - k, s), panel.close(t, s));
                    if p0 > 0.0 && p1 > 0.0 {
                        scores[t * w + s] = sign * (p1.ln() - p0.ln());
                    }
                }
            }
        }
        SignalMode::VwapRev => {
            // Rich vs. VWAP is a short candidate, so the score is -z.
            let z = vwap_zscore(panel, k);
            for (cell, zv) in z.iter().enumerate() {
                if zv.is_finite() {
                    scores[cell] = -zv;
                }
            }
        }
    }

    ScoreMatrix {
        scores,
        n_symbols: w,
    }
}
