//! PricePanel — dense bars × symbols price matrices with a shared time axis.
//!
//! The panel is the engine's only market-data input. It is stored as flat
//! row-major matrices (one row per bar) so the signal, sizing, and execution
//! stages can operate on whole cross-sections at a time instead of walking
//! per-symbol object graphs. Missing prices are NaN, never zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while constructing or slicing a panel.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("panel is empty: no bars")]
    Empty,

    #[error("panel has no symbols")]
    NoSymbols,

    #[error("timestamps not strictly increasing at bar {index}")]
    TimestampsNotIncreasing { index: usize },

    #[error("matrix length {len} does not match {bars} bars x {symbols} symbols")]
    DimensionMismatch {
        len: usize,
        bars: usize,
        symbols: usize,
    },

    #[error("slice range {start}..{end} out of bounds for {bars} bars")]
    SliceOutOfBounds {
        start: usize,
        end: usize,
        bars: usize,
    },
}

/// One long-form input row, as produced by the data loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarRecord {
    pub symbol: String,
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub close: f64,
    pub volume: f64,
}

/// Dense minute-bar panel: strictly increasing timestamps, fixed symbol axis.
///
/// `closes` (and `opens`/`volumes` when present) are row-major
/// `n_bars() * n_symbols()` matrices. A NaN entry means the symbol had no
/// bar at that timestamp; downstream stages must exclude it, not zero-fill.
#[derive(Debug, Clone)]
pub struct PricePanel {
    timestamps: Vec<DateTime<Utc>>,
    symbols: Vec<String>,
    closes: Vec<f64>,
    opens: Option<Vec<f64>>,
    volumes: Option<Vec<f64>>,
}

impl PricePanel {
    /// Build a panel from closes only.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        symbols: Vec<String>,
        closes: Vec<f64>,
    ) -> Result<Self, PanelError> {
        Self::with_opens_volumes(timestamps, symbols, closes, None, None)
    }

    /// Build a panel with optional open and volume matrices.
    pub fn with_opens_volumes(
        timestamps: Vec<DateTime<Utc>>,
        symbols: Vec<String>,
        closes: Vec<f64>,
        opens: Option<Vec<f64>>,
        volumes: Option<Vec<f64>>,
    ) -> Result<Self, PanelError> {
        if timestamps.is_empty() {
            return Err(PanelError::Empty);
        }
        if symbols.is_empty() {
            return Err(PanelError::NoSymbols);
        }
        for i in 1..timestamps.len() {
            if timestamps[i] <= timestamps[i - 1] {
                return Err(PanelError::TimestampsNotIncreasing { index: i });
            }
        }
        let expected = timestamps.len() * symbols.len();
        for matrix in [Some(&closes), opens.as_ref(), volumes.as_ref()]
            .into_iter()
            .flatten()
        {
            if matrix.len() != expected {
                return Err(PanelError::DimensionMismatch {
                    len: matrix.len(),
                    bars: timestamps.len(),
                    symbols: symbols.len(),
                });
            }
        }
        Ok(Self {
            timestamps,
            symbols,
            closes,
            opens,
            volumes,
        })
    }

    /// Pivot long-form records into a dense panel.
    ///
    /// The symbol axis is the first-seen order of symbols; the time axis is
    /// the sorted union of record timestamps. Cells without a record are NaN.
    pub fn from_records(records: &[BarRecord]) -> Result<Self, PanelError> {
        if records.is_empty() {
            return Err(PanelError::Empty);
        }
        let mut symbols: Vec<String> = Vec::new();
        for r in records {
            if !symbols.contains(&r.symbol) {
                symbols.push(r.symbol.clone());
            }
        }
        let mut timestamps: Vec<DateTime<Utc>> = records.iter().map(|r| r.datetime).collect();
        timestamps.sort_unstable();
        timestamps.dedup();

        let n = timestamps.len() * symbols.len();
        let mut closes = vec![f64::NAN; n];
        let mut opens = vec![f64::NAN; n];
        let mut volumes = vec![f64::NAN; n];
        for r in records {
            // Both lookups are over small, already-deduplicated axes.
            let t = timestamps.binary_search(&r.datetime).unwrap_or_else(|i| i);
            let s = symbols.iter().position(|s| *s == r.symbol).unwrap_or(0);
            let cell = t * symbols.len() + s;
            closes[cell] = r.close;
            opens[cell] = r.open;
            volumes[cell] = r.volume;
        }
        Self::with_opens_volumes(timestamps, symbols, closes, Some(opens), Some(volumes))
    }

    pub fn n_bars(&self) -> usize {
        self.timestamps.len()
    }

    pub fn n_symbols(&self) -> usize {
        self.symbols.len()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Close price for bar `t`, symbol index `s`.
    pub fn close(&self, t: usize, s: usize) -> f64 {
        self.closes[t * self.symbols.len() + s]
    }

    /// The full cross-section of closes at bar `t`.
    pub fn closes_at(&self, t: usize) -> &[f64] {
        let w = self.symbols.len();
        &self.closes[t * w..(t + 1) * w]
    }

    /// Open price for bar `t`, symbol index `s`; NaN when opens are absent.
    pub fn open(&self, t: usize, s: usize) -> f64 {
        match &self.opens {
            Some(o) => o[t * self.symbols.len() + s],
            None => f64::NAN,
        }
    }

    pub fn has_opens(&self) -> bool {
        self.opens.is_some()
    }

    /// Volume for bar `t`, symbol index `s`; NaN when volumes are absent.
    pub fn volume(&self, t: usize, s: usize) -> f64 {
        match &self.volumes {
            Some(v) => v[t * self.symbols.len() + s],
            None => f64::NAN,
        }
    }

    pub fn has_volumes(&self) -> bool {
        self.volumes.is_some()
    }

    /// Copy out the bar range `[start, end)` as a new panel.
    pub fn slice(&self, start: usize, end: usize) -> Result<Self, PanelError> {
        if start >= end || end > self.n_bars() {
            return Err(PanelError::SliceOutOfBounds {
                start,
                end,
                bars: self.n_bars(),
            });
        }
        let w = self.symbols.len();
        let cells = start * w..end * w;
        Ok(Self {
            timestamps: self.timestamps[start..end].to_vec(),
            symbols: self.symbols.clone(),
            closes: self.closes[cells.clone()].to_vec(),
            opens: self.opens.as_ref().map(|o| o[cells.clone()].to_vec()),
            volumes: self.volumes.as_ref().map(|v| v[cells].to_vec()),
        })
    }

    /// 0-based calendar-day bucket per bar (same UTC date = same bucket).
    pub fn day_index(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.n_bars());
        let mut day = 0usize;
        let mut prev = self.timestamps[0].date_naive();
        for ts in &self.timestamps {
            let d = ts.date_naive();
            if d != prev {
                day += 1;
                prev = d;
            }
            out.push(day);
        }
        out
    }

    /// 0-based bar number within each calendar day.
    ///
    /// Drives the rebalance cadence: the book updates on bars where
    /// `bar_in_day % rebalance_every == 0`.
    pub fn bar_in_day(&self) -> Vec<usize> {
        let days = self.day_index();
        let mut out = Vec::with_capacity(self.n_bars());
        let mut count = 0usize;
        for t in 0..self.n_bars() {
            if t > 0 && days[t] != days[t - 1] {
                count = 0;
            }
            out.push(count);
            count += 1;
        }
        out
    }

    /// Median bar count per day; used to annualize bar-level statistics.
    pub fn bars_per_day(&self) -> usize {
        let days = self.day_index();
        let n_days = days.last().map(|d| d + 1).unwrap_or(0);
        let mut counts = vec![0usize; n_days];
        for &d in &days {
            counts[d] += 1;
        }
        counts.sort_unstable();
        counts[counts.len() / 2].max(1)
    }

    /// Per-bar asset returns, row-major like the price matrices.
    ///
    /// With opens present this is the same-bar open→close return (positions
    /// executed on the open and held to the close); otherwise the
    /// close_{t-1}→close_t return. Bar 0 and any bar with a NaN input
    /// produce NaN.
    pub fn bar_returns(&self) -> Vec<f64> {
        let (n, w) = (self.n_bars(), self.n_symbols());
        let mut out = vec![f64::NAN; n * w];
        for t in 0..n {
            for s in 0..w {
                let r = if self.has_opens() {
                    let (o, c) = (self.open(t, s), self.close(t, s));
                    if o > 0.0 && c.is_finite() {
                        c / o - 1.0
                    } else {
                        f64::NAN
                    }
                } else if t > 0 {
                    let (p0, p1) = (self.close(t - 1, s), self.close(t, s));
                    if p0 > 0.0 && p1.is_finite() {
                        p1 / p0 - 1.0
                    } else {
                        f64::NAN
                    }
                } else {
                    f64::NAN
                };
                out[t * w + s] = r;
            }
        }
        out
    }
}
