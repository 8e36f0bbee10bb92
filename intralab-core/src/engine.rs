//! BacktestRunner — one strict in-time-order pass over the panel.
//!
//! Per bar: (re)rank and resize the book on rebalance bars, step the
//! execution simulator against the last-emitted target, charge costs on the
//! traded deltas, and accrue PnL on the weights held *before* this bar's
//! trades (the one-bar lag that keeps the simulation causal). No future
//! bar's price can influence an earlier bar's target or execution decision,
//! and identical inputs produce bit-identical outputs.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::{BacktestConfig, ConfigError};
use crate::domain::PricePanel;
use crate::execution::{CostModel, ExecutionSimulator};
use crate::portfolio::{sector_demean, size_positions, MembershipState};
use crate::signal::compute_scores;

/// Errors from a backtest run. Configuration problems surface before any
/// simulation; data problems surface before any partial result is built.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("insufficient data: {bars} bars < required {required} (lookback + 1)")]
    InsufficientData { bars: usize, required: usize },
}

/// Ordered per-bar output series of one run.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub timestamps: Vec<DateTime<Utc>>,
    pub symbols: Vec<String>,
    /// Gross return per bar (before costs).
    pub raw_ret: Vec<f64>,
    /// Net return per bar (after costs).
    pub net_ret: Vec<f64>,
    /// Transaction cost per bar, fraction of NAV.
    pub cost: Vec<f64>,
    /// Sum of |Δweight| per bar.
    pub turnover: Vec<f64>,
    /// Realized weights after each bar's trades, row-major bars x symbols.
    pub positions: Vec<f64>,
}

impl BacktestResult {
    pub fn n_bars(&self) -> usize {
        self.timestamps.len()
    }

    /// Compounded net equity curve starting at 1.0.
    pub fn equity_curve(&self) -> Vec<f64> {
        let mut eq = Vec::with_capacity(self.net_ret.len());
        let mut level = 1.0;
        for r in &self.net_ret {
            level *= 1.0 + r;
            eq.push(level);
        }
        eq
    }
}

/// Run one full backtest pass over the panel.
pub fn run_backtest(
    panel: &PricePanel,
    config: &BacktestConfig,
) -> Result<BacktestResult, EngineError> {
    config.validate()?;
    let required = config.lookback + 1;
    if panel.n_bars() < required {
        return Err(EngineError::InsufficientData {
            bars: panel.n_bars(),
            required,
        });
    }

    let (n, w) = (panel.n_bars(), panel.n_symbols());
    let scores = compute_scores(panel, config);
    let returns = panel.bar_returns();
    let bar_in_day = panel.bar_in_day();
    let day_index = panel.day_index();

    // Bars per day, for the end-of-day flatten window.
    let n_days = day_index.last().map(|d| d + 1).unwrap_or(0);
    let mut day_len = vec![0usize; n_days];
    for &d in &day_index {
        day_len[d] += 1;
    }

    let sector_ids = resolve_sectors(panel, config);
    let cost_model = CostModel::from_config(config);
    let mut membership = MembershipState::new(w);
    let mut simulator = ExecutionSimulator::new(w, config.exec, config.max_weight);
    let mut target = vec![0.0f64; w];

    let mut raw_ret = vec![0.0f64; n];
    let mut net_ret = vec![0.0f64; n];
    let mut cost = vec![0.0f64; n];
    let mut turnover = vec![0.0f64; n];
    let mut positions = vec![0.0f64; n * w];

    for t in 0..n {
        // Weights held coming into this bar earn this bar's return.
        let held: Vec<f64> = simulator.realized().to_vec();

        let in_skip_window = bar_in_day[t] < config.skip_first_bars;
        let bars_left_today = day_len[day_index[t]] - bar_in_day[t];
        let in_flatten_window =
            config.eod_flatten_bars > 0 && bars_left_today <= config.eod_flatten_bars;

        if !in_skip_window && bar_in_day[t] % config.rebalance_every == 0 {
            let row = match (&sector_ids, config.sector_neutral) {
                (Some((ids, n_sectors)), true) => sector_demean(scores.row(t), ids, *n_sectors),
                _ => scores.row(t).to_vec(),
            };
            membership.update(&row, config.q_in, config.q_out);
            target = size_positions(membership.sides(), &row, config);
        }

        let deltas = if in_flatten_window {
            simulator.flatten()
        } else if in_skip_window {
            vec![0.0; w] // session trim: no trading on early bars
        } else {
            simulator.step(&target)
        };

        turnover[t] = deltas.iter().map(|d| d.abs()).sum();
        cost[t] = cost_model.bar_cost(&deltas);

        let mut gross = 0.0;
        for s in 0..w {
            let r = returns[t * w + s];
            if r.is_finite() {
                gross += held[s] * r;
            }
        }
        raw_ret[t] = gross;
        net_ret[t] = gross - cost[t];
        positions[t * w..(t + 1) * w].copy_from_slice(simulator.realized());
    }

    Ok(BacktestResult {
        timestamps: panel.timestamps().to_vec(),
        symbols: panel.symbols().to_vec(),
        raw_ret,
        net_ret,
        cost,
        turnover,
        positions,
    })
}

/// Map panel symbols onto dense sector ids from the configured mapping.
/// Returns None when no mapping is configured.
fn resolve_sectors(
    panel: &PricePanel,
    config: &BacktestConfig,
) -> Option<(Vec<Option<usize>>, usize)> {
    if config.sectors.is_empty() {
        return None;
    }
    let mut names: Vec<String> = Vec::new();
    let mut ids = Vec::with_capacity(panel.n_symbols());
    for sym in panel.symbols() {
        let id = config.sectors.get(sym).map(|sector| {
            match names.iter().position(|n| n == sector) {
                Some(i) => i,
                None => {
                    names.push(sector.clone());
                    names.len() - 1
                }
            }
        });
        ids.push(id);
    }
    Some((ids, names.len()))
}
