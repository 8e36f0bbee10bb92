//! Position sizing: membership → signed target weights.
//!
//! Pipeline: raw weights (equal or score-proportional, optionally
//! book-normalized for market neutrality) → scale to the gross target →
//! per-name cap → one rescale to re-hit gross. The final rescale keeps the
//! gross bound exact while leaving the per-name cap approximate. Under
//! market neutrality the common scalar keeps net at 0 as long as the cap
//! binds symmetrically; a cap that clips only one book reintroduces net
//! exposure. This is the documented resolution of the cap/neutrality
//! interaction: books first, gross last.

use crate::config::{BacktestConfig, Weighting};
use crate::portfolio::membership::{LONG, SHORT};

/// Convert the membership sides into signed target weights.
///
/// `scores` is the same cross-section the membership update ranked; it is
/// only consulted under score-proportional weighting. Books smaller than
/// intended are sized as-is — no synthetic fill.
pub fn size_positions(sides: &[i8], scores: &[f64], config: &BacktestConfig) -> Vec<f64> {
    let mut raw: Vec<f64> = sides
        .iter()
        .zip(scores)
        .map(|(&side, &score)| {
            let magnitude = match config.weighting {
                Weighting::Equal => 1.0,
                Weighting::ScoreProportional => {
                    if score.is_finite() && score.abs() > 0.0 {
                        score.abs()
                    } else {
                        1.0
                    }
                }
            };
            side as f64 * magnitude
        })
        .collect();

    if config.market_neutral {
        normalize_books(&mut raw, config.gross);
    } else {
        let gross_now: f64 = raw.iter().map(|w| w.abs()).sum();
        if gross_now > 0.0 {
            let k = config.gross / gross_now;
            raw.iter_mut().for_each(|w| *w *= k);
        }
    }

    // Per-name cap, then one rescale to re-hit the gross target.
    for w in raw.iter_mut() {
        *w = w.clamp(-config.max_weight, config.max_weight);
    }
    let gross_now: f64 = raw.iter().map(|w| w.abs()).sum();
    if gross_now > 0.0 {
        let k = config.gross / gross_now;
        raw.iter_mut().for_each(|w| *w *= k);
    }
    raw
}

/// Normalize the long and short books independently to gross/2 each.
///
/// When only one book is populated it still gets gross/2, keeping per-name
/// sizes stable across bars where the other side happens to be empty.
fn normalize_books(weights: &mut [f64], gross: f64) {
    let long_sum: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    let short_sum: f64 = weights.iter().filter(|w| **w < 0.0).map(|w| -w).sum();
    for w in weights.iter_mut() {
        if *w > 0.0 && long_sum > 0.0 {
            *w *= gross / 2.0 / long_sum;
        } else if *w < 0.0 && short_sum > 0.0 {
            *w *= gross / 2.0 / short_sum;
        }
    }
}

/// De-mean scores within sector buckets, then across the whole section.
///
/// `sector_ids[s]` is the bucket for symbol s, `None` = unbucketed (only
/// de-meaned globally). NaN scores are excluded from every mean and stay NaN.
pub fn sector_demean(scores: &[f64], sector_ids: &[Option<usize>], n_sectors: usize) -> Vec<f64> {
    let mut out = scores.to_vec();
    let mut sums = vec![0.0f64; n_sectors];
    let mut counts = vec![0usize; n_sectors];
    for (s, &score) in scores.iter().enumerate() {
        if let (Some(sec), true) = (sector_ids[s], score.is_finite()) {
            sums[sec] += score;
            counts[sec] += 1;
        }
    }
    for (s, v) in out.iter_mut().enumerate() {
        if let (Some(sec), true) = (sector_ids[s], v.is_finite()) {
            if counts[sec] > 0 {
                *v -= sums[sec] / counts[sec] as f64;
            }
        }
    }
    // Residual market mean.
    let finite: Vec<f64> = out.iter().copied().filter(|v| v.is_finite()).collect();
    if !finite.is_empty() {
        let mean = finite.iter().sum::<f64>() / finite.len() as f64;
        for v in out.iter_mut() {
            if v.is_finite() {
                *v -= mean;
            }
        }
    }
    out
}
