//! IntraLab Runner — run orchestration, metrics, walk-forward, export.
//!
//! This crate builds on `intralab-core` to provide:
//! - Run configuration files with content-hash run identity
//! - Performance metrics with intraday-aware annualization
//! - Parallel rolling-origin walk-forward evaluation with embargo
//! - JSON/CSV artifact export

pub mod export;
pub mod metrics;
pub mod runner;
pub mod walk_forward;

pub use metrics::Summary;
pub use runner::{run_single, DataConfig, RunConfig, RunError, RunId, RunOutput};
pub use walk_forward::{
    run_walk_forward, window_specs, WalkForwardConfig, WalkForwardError, WalkForwardResult,
    WindowResult, WindowSpec,
};
