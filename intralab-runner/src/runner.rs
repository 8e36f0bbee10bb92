//! Run orchestration: config file loading, run identity, single runs.

use std::path::Path;

use intralab_core::{run_backtest, BacktestConfig, BacktestResult, EngineError, PricePanel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::Summary;
use crate::walk_forward::WalkForwardConfig;

/// Unique identifier for a run (content-addressable hash of the config).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to read config {path}: {source}")]
    ReadConfig {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ParseConfig {
        path: String,
        source: toml::de::Error,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Data-loading parameters for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Long-form bar file (Parquet or CSV).
    pub path: String,
    /// Drop rows with close below this price.
    pub min_price: f64,
    /// Keep the top-N symbols by median daily dollar volume; 0 keeps all.
    pub universe_size: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            min_price: 5.0,
            universe_size: 0,
        }
    }
}

/// Everything needed to reproduce one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub data: DataConfig,
    pub backtest: BacktestConfig,
    pub walk_forward: WalkForwardConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            backtest: BacktestConfig::default(),
            walk_forward: WalkForwardConfig::default(),
        }
    }
}

impl RunConfig {
    /// Deterministic content hash. Two identical configs share a RunId, so
    /// outputs can be cached and cross-referenced.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Load from a TOML file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, RunError> {
        let text = std::fs::read_to_string(path).map_err(|source| RunError::ReadConfig {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| RunError::ParseConfig {
            path: path.display().to_string(),
            source,
        })
    }
}

/// One finished backtest with its identity and headline metrics.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub run_id: RunId,
    pub summary: Summary,
    #[serde(skip)]
    pub result: BacktestResult,
}

/// Run the configured backtest over a panel.
pub fn run_single(panel: &PricePanel, config: &RunConfig) -> Result<RunOutput, RunError> {
    let result = run_backtest(panel, &config.backtest)?;
    let summary = Summary::from_result(&result, config.backtest.bars_per_day);
    Ok(RunOutput {
        run_id: config.run_id(),
        summary,
        result,
    })
}
