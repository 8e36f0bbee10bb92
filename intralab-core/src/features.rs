//! Feature construction on the price panel.
//!
//! Everything here is look-ahead safe: a value at bar t only uses data up to
//! and including bar t's close, and the incremental VWAP deliberately stops
//! at t-1 so the current bar cannot see its own volume-weighted print.
//!
//! All outputs are row-major `n_bars * n_symbols` matrices aligned with the
//! panel, NaN where a value is undefined.

use crate::domain::PricePanel;

/// Intraday VWAP up to the previous bar, per symbol, reset each day.
///
/// For the first bar of a day (no accumulated volume yet) the VWAP falls
/// back to the current close, matching the convention that early bars are
/// typically trimmed from the session anyway.
pub fn incremental_vwap(panel: &PricePanel) -> Vec<f64> {
    let (n, w) = (panel.n_bars(), panel.n_symbols());
    let days = panel.day_index();
    let mut out = vec![f64::NAN; n * w];
    let mut num = vec![0.0f64; w];
    let mut den = vec![0.0f64; w];
    for t in 0..n {
        if t > 0 && days[t] != days[t - 1] {
            num.fill(0.0);
            den.fill(0.0);
        }
        for s in 0..w {
            let close = panel.close(t, s);
            out[t * w + s] = if den[s] > 0.0 { num[s] / den[s] } else { close };
            let vol = panel.volume(t, s);
            if close.is_finite() && vol.is_finite() {
                num[s] += close * vol;
                den[s] += vol;
            }
        }
    }
    out
}

/// Rolling standard deviation of one-bar log close returns, per symbol.
///
/// A value appears once at least `max(2, lookback / 2)` returns are in the
/// window; before that the cell is NaN (excluded, not zero-filled).
pub fn rolling_vol(panel: &PricePanel, lookback: usize) -> Vec<f64> {
    let (n, w) = (panel.n_bars(), panel.n_symbols());
    let min_obs = 2.max(lookback / 2);
    let mut out = vec![f64::NAN; n * w];
    for s in 0..w {
        // One-bar log returns for this symbol; NaN where prices are missing.
        let mut rets = vec![f64::NAN; n];
        for t in 1..n {
            let (p0, p1) = (panel.close(t - 1, s), panel.close(t, s));
            if p0 > 0.0 && p1 > 0.0 {
                rets[t] = (p1 / p0).ln();
            }
        }
        for t in 0..n {
            let start = (t + 1).saturating_sub(lookback);
            let window: Vec<f64> = rets[start..=t].iter().copied().filter(|r| r.is_finite()).collect();
            if window.len() >= min_obs {
                out[t * w + s] = sample_std(&window);
            }
        }
    }
    out
}

/// Z-score of close minus incremental VWAP, scaled by rolling volatility.
///
/// The classic intraday mean-reversion deviation: positive values mean the
/// price is rich relative to the day's volume-weighted average. NaN where
/// either input is undefined or volatility is zero.
pub fn vwap_zscore(panel: &PricePanel, vol_lookback: usize) -> Vec<f64> {
    let (n, w) = (panel.n_bars(), panel.n_symbols());
    let vwap = incremental_vwap(panel);
    let sigma = rolling_vol(panel, vol_lookback);
    let mut out = vec![f64::NAN; n * w];
    for cell in 0..n * w {
        let (c, v, sg) = (
            panel.closes_at(cell / w)[cell % w],
            vwap[cell],
            sigma[cell],
        );
        if c.is_finite() && v.is_finite() && sg.is_finite() && sg > 0.0 {
            out[cell] = (c - v) / sg;
        }
    }
    out
}

fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}
