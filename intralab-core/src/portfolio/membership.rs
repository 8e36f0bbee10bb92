//! Sticky long/short membership with hysteresis.
//!
//! Entry and exit use different percentile thresholds (q_in < q_out): a
//! symbol enters the long book only when its rank clears 1 - q_in but stays
//! until its rank drops below 1 - q_out. The band between the two thresholds
//! absorbs single-bar rank flicker.

use serde::{Deserialize, Serialize};

/// Per-symbol book side.
pub const LONG: i8 = 1;
pub const FLAT: i8 = 0;
pub const SHORT: i8 = -1;

/// Membership state carried across rebalance bars.
///
/// Created empty at backtest start, updated on each rebalance bar, and
/// discarded at the end of the run. An explicit value, passed in and out,
/// so runs are deterministic and walk-forward windows stay independent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipState {
    /// Book side per symbol: -1, 0, +1.
    sides: Vec<i8>,
    /// Percentile rank each current member had when it entered; NaN if flat.
    entry_ranks: Vec<f64>,
}

impl MembershipState {
    pub fn new(n_symbols: usize) -> Self {
        Self {
            sides: vec![FLAT; n_symbols],
            entry_ranks: vec![f64::NAN; n_symbols],
        }
    }

    pub fn sides(&self) -> &[i8] {
        &self.sides
    }

    pub fn side(&self, symbol: usize) -> i8 {
        self.sides[symbol]
    }

    /// Percentile rank at entry for a current member, NaN for flat symbols.
    pub fn entry_rank(&self, symbol: usize) -> f64 {
        self.entry_ranks[symbol]
    }

    /// Apply one rebalance update from the bar's cross-sectional scores.
    ///
    /// Symbols without a score (NaN) are evicted: no rank means no defensible
    /// claim to a book slot. Validated thresholds (q_in < q_out) are the
    /// caller's responsibility via config validation.
    pub fn update(&mut self, scores: &[f64], q_in: f64, q_out: f64) {
        let ranks = pct_ranks(scores);
        for s in 0..self.sides.len() {
            let r = ranks[s];
            if !r.is_finite() {
                self.sides[s] = FLAT;
                self.entry_ranks[s] = f64::NAN;
                continue;
            }
            let was = self.sides[s];
            let stay_long = was == LONG && r >= 1.0 - q_out;
            let stay_short = was == SHORT && r <= q_out;
            let enter_long = was != LONG && r >= 1.0 - q_in;
            let enter_short = was != SHORT && r <= q_in;

            // Short claims resolve last and win a contested slot. With
            // q_in < 0.5 both entries cannot fire on the same bar.
            let next = if stay_short || enter_short {
                SHORT
            } else if stay_long || enter_long {
                LONG
            } else {
                FLAT
            };
            if next != was {
                self.entry_ranks[s] = if next == FLAT { f64::NAN } else { r };
            }
            self.sides[s] = next;
        }
    }

}

/// Percentile ranks in (0, 1], stable "first" tie-breaking.
///
/// Ties are broken by original symbol order, so equal scores always rank in
/// the same deterministic order. NaN scores get NaN ranks.
pub fn pct_ranks(scores: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..scores.len())
        .filter(|&i| scores[i].is_finite())
        .collect();
    // Stable sort by score; equal scores keep ascending index order.
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let count = order.len() as f64;
    let mut ranks = vec![f64::NAN; scores.len()];
    for (pos, &i) in order.iter().enumerate() {
        ranks[i] = (pos + 1) as f64 / count;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pct_ranks_stable_tie_break() {
        let ranks = pct_ranks(&[1.0, 2.0, 2.0, 0.5]);
        // Order: 0.5 (idx 3), 1.0 (idx 0), 2.0 (idx 1), 2.0 (idx 2)
        assert!((ranks[3] - 0.25).abs() < 1e-12);
        assert!((ranks[0] - 0.50).abs() < 1e-12);
        assert!((ranks[1] - 0.75).abs() < 1e-12);
        assert!((ranks[2] - 1.00).abs() < 1e-12);
    }

    #[test]
    fn pct_ranks_skip_nan() {
        let ranks = pct_ranks(&[3.0, f64::NAN, 1.0]);
        assert!(ranks[1].is_nan());
        assert!((ranks[2] - 0.5).abs() < 1e-12);
        assert!((ranks[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn thresholds_split_books() {
        let mut m = MembershipState::new(4);
        m.update(&[0.1, 0.4, 0.2, 0.3], 0.25, 0.5);
        // Ranks: [0.25, 1.0, 0.5, 0.75]. Entry long needs rank >= 0.75,
        // entry short needs rank <= 0.25.
        assert_eq!(m.sides(), &[SHORT, LONG, FLAT, LONG]);
    }

    #[test]
    fn member_in_hysteresis_band_is_retained() {
        // 5 symbols, q_in = 0.2, q_out = 0.6: entry long at rank >= 0.8,
        // exit long below rank 0.4.
        let mut m = MembershipState::new(5);
        m.update(&[0.1, 0.2, 0.3, 0.4, 0.9], 0.2, 0.6);
        assert_eq!(m.side(4), LONG);
        // Symbol 4 slips to rank 0.6: not enough for a fresh entry, but
        // above the exit threshold. It stays; nothing else enters long.
        m.update(&[0.1, 0.2, 0.9, 0.4, 0.35], 0.2, 0.6);
        assert_eq!(m.side(4), LONG);
        assert_eq!(m.side(2), LONG); // rank 1.0 enters
    }

    #[test]
    fn member_below_exit_threshold_is_evicted() {
        let mut m = MembershipState::new(4);
        m.update(&[0.1, 0.4, 0.2, 0.3], 0.25, 0.5);
        assert_eq!(m.side(1), LONG);
        // Symbol 1 drops to rank 0.25: below 1 - q_out → evicted.
        m.update(&[0.3, 0.1, 0.2, 0.4], 0.25, 0.5);
        assert_eq!(m.side(1), SHORT); // rank 0.25 <= q_in → flips short
    }

    #[test]
    fn no_flicker_across_consecutive_rebalances() {
        // A symbol whose rank oscillates strictly inside (1-q_out, 1-q_in)
        // keeps its membership on every update.
        let mut m = MembershipState::new(5);
        m.update(&[0.1, 0.2, 0.3, 0.4, 0.9], 0.2, 0.6);
        assert_eq!(m.side(4), LONG);
        for scores in [
            [0.1, 0.2, 0.9, 0.4, 0.35], // rank of sym 4 = 0.6
            [0.1, 0.3, 0.9, 0.4, 0.2],  // rank of sym 4 = 0.4, still >= 1 - q_out
        ] {
            m.update(&scores, 0.2, 0.6);
            assert_eq!(m.side(4), LONG, "membership flickered on {scores:?}");
        }
    }

    #[test]
    fn nan_score_evicts_member() {
        let mut m = MembershipState::new(3);
        m.update(&[0.1, 0.2, 0.9], 0.34, 0.67);
        assert_eq!(m.side(2), LONG);
        m.update(&[0.1, 0.2, f64::NAN], 0.34, 0.67);
        assert_eq!(m.side(2), FLAT);
    }

    #[test]
    fn entry_rank_recorded_and_cleared() {
        let mut m = MembershipState::new(2);
        m.update(&[0.1, 0.9], 0.5, 0.75);
        assert!((m.entry_rank(1) - 1.0).abs() < 1e-12);
        assert!((m.entry_rank(0) - 0.5).abs() < 1e-12);
        m.update(&[0.9, f64::NAN], 0.5, 0.75);
        assert!(m.entry_rank(1).is_nan());
    }

    #[test]
    fn all_nan_scores_empty_book() {
        let mut m = MembershipState::new(3);
        m.update(&[f64::NAN; 3], 0.25, 0.5);
        assert_eq!(m.sides(), &[FLAT; 3]);
    }
}
