//! Rolling-origin walk-forward evaluation with an embargo gap.
//!
//! Windows are laid out in bar units: train `[k*step, k*step + train_len)`,
//! then `embargo_len` bars are discarded, then test
//! `[train_end + embargo, train_end + embargo + test_len)`. A window is kept
//! only if the full test range fits inside the panel. The same configuration
//! is evaluated on every window; test windows never overlap their train
//! windows and the embargo keeps signal lookback from leaking across the
//! boundary.

use intralab_core::{run_backtest, BacktestConfig, EngineError, PricePanel};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::Summary;

#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("train_len must be > 0")]
    ZeroTrainLen,

    #[error("test_len must be > 0")]
    ZeroTestLen,

    #[error("step_len must be > 0")]
    ZeroStepLen,

    #[error("panel of {n_bars} bars is too short for a single window ({required} bars required)")]
    NoWindows { n_bars: usize, required: usize },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Panel(#[from] intralab_core::PanelError),
}

/// Window layout, all in bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    pub train_len: usize,
    pub test_len: usize,
    /// Bars discarded between train end and test start.
    pub embargo_len: usize,
    /// Origin advance between consecutive windows.
    pub step_len: usize,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_len: 1560, // 20 days of 78 five-minute bars
            test_len: 390,
            embargo_len: 78,
            step_len: 390,
        }
    }
}

/// Half-open bar ranges of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub index: usize,
    pub train_start: usize,
    pub train_end: usize,
    pub test_start: usize,
    pub test_end: usize,
}

/// One evaluated window: the same config run in-sample and out-of-sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    pub spec: WindowSpec,
    pub train: Summary,
    pub test: Summary,
}

/// Aggregated walk-forward outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub windows: Vec<WindowResult>,
    /// Summary over the concatenated out-of-sample net return series.
    pub combined_test: Summary,
    /// Mean test Sharpe divided by mean train Sharpe; 0.0 when the train
    /// side is flat. Values well below 1 indicate in-sample overfit.
    pub degradation: f64,
}

/// Enumerate the window layout for a panel of `n_bars` bars.
pub fn window_specs(n_bars: usize, config: &WalkForwardConfig) -> Result<Vec<WindowSpec>, WalkForwardError> {
    if config.train_len == 0 {
        return Err(WalkForwardError::ZeroTrainLen);
    }
    if config.test_len == 0 {
        return Err(WalkForwardError::ZeroTestLen);
    }
    if config.step_len == 0 {
        return Err(WalkForwardError::ZeroStepLen);
    }
    let required = config.train_len + config.embargo_len + config.test_len;
    let mut specs = Vec::new();
    let mut start = 0usize;
    while start + required <= n_bars {
        let train_end = start + config.train_len;
        let test_start = train_end + config.embargo_len;
        specs.push(WindowSpec {
            index: specs.len(),
            train_start: start,
            train_end,
            test_start,
            test_end: test_start + config.test_len,
        });
        start += config.step_len;
    }
    if specs.is_empty() {
        return Err(WalkForwardError::NoWindows { n_bars, required });
    }
    Ok(specs)
}

/// Evaluate `config` across every walk-forward window of the panel.
/// Windows run in parallel; results come back in window order.
pub fn run_walk_forward(
    panel: &PricePanel,
    config: &BacktestConfig,
    wf: &WalkForwardConfig,
) -> Result<WalkForwardResult, WalkForwardError> {
    let specs = window_specs(panel.n_bars(), wf)?;

    let per_window: Result<Vec<(WindowResult, CombinedSeries)>, WalkForwardError> = specs
        .par_iter()
        .map(|spec| {
            let train_panel = panel.slice(spec.train_start, spec.train_end)?;
            let test_panel = panel.slice(spec.test_start, spec.test_end)?;
            let train_run = run_backtest(&train_panel, config)?;
            let test_run = run_backtest(&test_panel, config)?;
            let result = WindowResult {
                spec: *spec,
                train: Summary::from_result(&train_run, config.bars_per_day),
                test: Summary::from_result(&test_run, config.bars_per_day),
            };
            let series = CombinedSeries {
                raw_ret: test_run.raw_ret,
                net_ret: test_run.net_ret,
                cost: test_run.cost,
                turnover: test_run.turnover,
            };
            Ok((result, series))
        })
        .collect();
    let per_window = per_window?;

    let mut windows = Vec::with_capacity(per_window.len());
    let mut combined = CombinedSeries::default();
    for (result, series) in per_window {
        combined.extend(series);
        windows.push(result);
    }

    let bpd = windows[0].test.bars_per_day;
    let combined_test = combined.summary(bpd);

    let mean_train = crate::metrics::mean(
        &windows.iter().map(|w| w.train.sharpe_net).collect::<Vec<_>>(),
    );
    let mean_test = crate::metrics::mean(
        &windows.iter().map(|w| w.test.sharpe_net).collect::<Vec<_>>(),
    );
    let degradation = if mean_train.abs() > 1e-12 {
        mean_test / mean_train
    } else {
        0.0
    };

    Ok(WalkForwardResult {
        windows,
        combined_test,
        degradation,
    })
}

/// Concatenated out-of-sample series across all test windows.
#[derive(Debug, Default)]
struct CombinedSeries {
    raw_ret: Vec<f64>,
    net_ret: Vec<f64>,
    cost: Vec<f64>,
    turnover: Vec<f64>,
}

impl CombinedSeries {
    fn extend(&mut self, other: CombinedSeries) {
        self.raw_ret.extend(other.raw_ret);
        self.net_ret.extend(other.net_ret);
        self.cost.extend(other.cost);
        self.turnover.extend(other.turnover);
    }

    /// Summary over the stitched series (no timestamps to infer from, so
    /// `bars_per_day` must be supplied).
    fn summary(&self, bars_per_day: usize) -> Summary {
        use crate::metrics::{
            annualized_return, max_drawdown, mean, sample_std, sharpe, TRADING_DAYS_PER_YEAR,
        };
        let bpd_f = bars_per_day.max(1) as f64;
        let ann_factor = TRADING_DAYS_PER_YEAR * bpd_f;
        Summary {
            n_bars: self.net_ret.len(),
            bars_per_day,
            sharpe_raw: sharpe(&self.raw_ret, ann_factor),
            sharpe_net: sharpe(&self.net_ret, ann_factor),
            annual_return_net: annualized_return(&self.net_ret, ann_factor),
            max_drawdown: max_drawdown(&self.net_ret),
            daily_raw_bps: mean(&self.raw_ret) * bpd_f * 1e4,
            daily_net_bps: mean(&self.net_ret) * bpd_f * 1e4,
            daily_vol_bps: sample_std(&self.net_ret) * bpd_f.sqrt() * 1e4,
            turnover_per_day: mean(&self.turnover) * bpd_f,
            cost_per_day_bps: mean(&self.cost) * bpd_f * 1e4,
        }
    }
}


#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Every generated window fits in the panel, keeps the embargo gap,
        /// and has the configured lengths.
        #[test]
        fn window_layout_invariants(
            n_bars in 1usize..2000,
            train_len in 1usize..200,
            test_len in 1usize..100,
            embargo_len in 0usize..50,
            step_len in 1usize..100,
        ) {
            let wf = WalkForwardConfig { train_len, test_len, embargo_len, step_len };
            match window_specs(n_bars, &wf) {
                Ok(specs) => {
                    prop_assert!(!specs.is_empty());
                    for (i, spec) in specs.iter().enumerate() {
                        prop_assert_eq!(spec.index, i);
                        prop_assert_eq!(spec.train_start, i * step_len);
                        prop_assert_eq!(spec.train_end - spec.train_start, train_len);
                        prop_assert_eq!(spec.test_start - spec.train_end, embargo_len);
                        prop_assert_eq!(spec.test_end - spec.test_start, test_len);
                        prop_assert!(spec.test_end <= n_bars);
                    }
                }
                Err(WalkForwardError::NoWindows { required, .. }) => {
                    prop_assert!(n_bars < required);
                }
                Err(e) => prop_assert!(false, "unexpected error: {e}"),
            }
        }
    }
}
