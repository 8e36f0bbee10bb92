//! Portfolio construction: sticky membership and position sizing.

pub mod membership;
pub mod sizing;

pub use membership::{pct_ranks, MembershipState, FLAT, LONG, SHORT};
pub use sizing::{sector_demean, size_positions};
