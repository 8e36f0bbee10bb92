//! IntraLab Core — intraday cross-sectional backtesting engine.
//!
//! This crate contains the heart of the simulation pipeline:
//! - Panel domain types (aligned minute-bar price/volume matrices)
//! - Cross-sectional signals (momentum, mean reversion, VWAP reversion)
//! - Sticky quantile membership with hysteresis
//! - Position sizing with gross targeting and per-name caps
//! - Execution throttling (rate limit, no-trade band, weight grid)
//! - Transaction cost model and the bar-by-bar backtest loop
//! - Long-form bar ingestion from Parquet/CSV

pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod execution;
pub mod features;
pub mod portfolio;
pub mod signal;

pub use config::{BacktestConfig, ConfigError, ExecMode, ImpactCurve, SignalMode, Weighting};
pub use domain::{BarRecord, PanelError, PricePanel};
pub use engine::{run_backtest, BacktestResult, EngineError};
pub use execution::{CostModel, ExecutionSimulator};
pub use portfolio::MembershipState;
pub use signal::{compute_scores, ScoreMatrix};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the parallel walk-forward evaluator
    /// moves across threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<PricePanel>();
        require_sync::<PricePanel>();
        require_send::<BarRecord>();
        require_sync::<BarRecord>();
        require_send::<BacktestConfig>();
        require_sync::<BacktestConfig>();
        require_send::<ScoreMatrix>();
        require_sync::<ScoreMatrix>();
        require_send::<MembershipState>();
        require_sync::<MembershipState>();
        require_send::<ExecutionSimulator>();
        require_sync::<ExecutionSimulator>();
        require_send::<CostModel>();
        require_sync::<CostModel>();
        require_send::<BacktestResult>();
        require_sync::<BacktestResult>();

        require_send::<ConfigError>();
        require_sync::<ConfigError>();
        require_send::<EngineError>();
        require_sync::<EngineError>();
        require_send::<PanelError>();
        require_sync::<PanelError>();
        require_send::<data::DataError>();
        require_sync::<data::DataError>();
    }
}
