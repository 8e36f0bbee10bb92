//! Performance metrics over per-bar return series.
//!
//! All annualization assumes 252 trading days per year and scales by the
//! observed (or configured) bar count per day, so a 5-minute backtest and a
//! daily one report comparable Sharpe ratios. Degenerate series (too short,
//! zero variance) report 0.0 rather than NaN so downstream sorting and
//! serialization stay well defined.

use intralab_core::BacktestResult;
use serde::{Deserialize, Serialize};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Headline metrics for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub n_bars: usize,
    pub bars_per_day: usize,
    /// Annualized Sharpe of gross (pre-cost) per-bar returns.
    pub sharpe_raw: f64,
    /// Annualized Sharpe of net per-bar returns.
    pub sharpe_net: f64,
    /// Annualized net return from the compounded equity curve.
    pub annual_return_net: f64,
    /// Max peak-to-trough drawdown of compounded net equity, as a fraction.
    pub max_drawdown: f64,
    /// Mean gross return per day, in bps.
    pub daily_raw_bps: f64,
    /// Mean net return per day, in bps.
    pub daily_net_bps: f64,
    /// Daily net volatility, in bps.
    pub daily_vol_bps: f64,
    /// Mean one-sided turnover per day (sum of |Δw| across symbols).
    pub turnover_per_day: f64,
    /// Mean cost drag per day, in bps.
    pub cost_per_day_bps: f64,
}

impl Summary {
    /// Compute from a finished backtest. `bars_per_day` of 0 means infer
    /// from the result's timestamps.
    pub fn from_result(result: &BacktestResult, bars_per_day: usize) -> Self {
        let bpd = if bars_per_day > 0 {
            bars_per_day
        } else {
            infer_bars_per_day(result)
        };
        let bpd_f = bpd.max(1) as f64;
        let ann_factor = TRADING_DAYS_PER_YEAR * bpd_f;

        let daily_net = mean(&result.net_ret) * bpd_f;
        let daily_vol = sample_std(&result.net_ret) * bpd_f.sqrt();

        Self {
            n_bars: result.net_ret.len(),
            bars_per_day: bpd,
            sharpe_raw: sharpe(&result.raw_ret, ann_factor),
            sharpe_net: sharpe(&result.net_ret, ann_factor),
            annual_return_net: annualized_return(&result.net_ret, ann_factor),
            max_drawdown: max_drawdown(&result.net_ret),
            daily_raw_bps: mean(&result.raw_ret) * bpd_f * 1e4,
            daily_net_bps: daily_net * 1e4,
            daily_vol_bps: daily_vol * 1e4,
            turnover_per_day: mean(&result.turnover) * bpd_f,
            cost_per_day_bps: mean(&result.cost) * bpd_f * 1e4,
        }
    }
}

fn infer_bars_per_day(result: &BacktestResult) -> usize {
    use std::collections::HashMap;
    let mut counts: HashMap<chrono::NaiveDate, usize> = HashMap::new();
    for ts in &result.timestamps {
        *counts.entry(ts.date_naive()).or_insert(0) += 1;
    }
    if counts.is_empty() {
        return 1;
    }
    let mut sizes: Vec<usize> = counts.into_values().collect();
    sizes.sort_unstable();
    sizes[sizes.len() / 2].max(1)
}

// ─── Pure series statistics ──────────────────────────────────────────

pub fn mean(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().sum::<f64>() / series.len() as f64
}

pub fn sample_std(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let m = mean(series);
    let var = series.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (series.len() - 1) as f64;
    var.sqrt()
}

/// Annualized Sharpe ratio. Zero-variance and short series report 0.0.
pub fn sharpe(series: &[f64], periods_per_year: f64) -> f64 {
    let sd = sample_std(series);
    if sd <= 0.0 {
        return 0.0;
    }
    mean(series) / sd * periods_per_year.sqrt()
}

/// Geometric annualized return of the compounded series.
pub fn annualized_return(series: &[f64], periods_per_year: f64) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let terminal: f64 = series.iter().map(|r| 1.0 + r).product();
    if terminal <= 0.0 {
        return -1.0;
    }
    terminal.powf(periods_per_year / series.len() as f64) - 1.0
}

/// Max peak-to-trough drawdown of the compounded equity curve, as a
/// positive fraction (0.10 = a 10% drawdown).
pub fn max_drawdown(series: &[f64]) -> f64 {
    let mut equity = 1.0;
    let mut peak = 1.0;
    let mut worst: f64 = 0.0;
    for r in series {
        equity *= 1.0 + r;
        if equity > peak {
            peak = equity;
        }
        worst = worst.max(1.0 - equity / peak);
    }
    worst
}
