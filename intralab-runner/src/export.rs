//! Reporting and export — JSON and CSV artifact generation.
//!
//! Two export surfaces:
//! - **JSON**: run summary and walk-forward outcome for machine consumers
//! - **CSV**: per-bar series and per-window tables for external analysis

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use intralab_core::BacktestResult;

use crate::metrics::Summary;
use crate::runner::RunOutput;
use crate::walk_forward::WalkForwardResult;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a run summary to pretty JSON.
pub fn export_summary_json(summary: &Summary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("failed to serialize summary to JSON")
}

/// Serialize a walk-forward outcome to pretty JSON.
pub fn export_walk_forward_json(result: &WalkForwardResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize walk-forward result to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Per-bar series as CSV.
///
/// Columns: timestamp, raw_ret, net_ret, cost, turnover, equity
pub fn export_series_csv(result: &BacktestResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "raw_ret", "net_ret", "cost", "turnover", "equity"])?;
    let equity = result.equity_curve();
    for t in 0..result.net_ret.len() {
        wtr.write_record([
            &result.timestamps[t].to_rfc3339(),
            &format!("{:.10}", result.raw_ret[t]),
            &format!("{:.10}", result.net_ret[t]),
            &format!("{:.10}", result.cost[t]),
            &format!("{:.10}", result.turnover[t]),
            &format!("{:.10}", equity[t]),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Walk-forward window table as CSV, one row per window.
pub fn export_windows_csv(result: &WalkForwardResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "window",
        "train_start",
        "train_end",
        "test_start",
        "test_end",
        "train_sharpe_net",
        "test_sharpe_net",
        "test_daily_net_bps",
        "test_max_drawdown",
    ])?;
    for w in &result.windows {
        wtr.write_record([
            &w.spec.index.to_string(),
            &w.spec.train_start.to_string(),
            &w.spec.train_end.to_string(),
            &w.spec.test_start.to_string(),
            &w.spec.test_end.to_string(),
            &format!("{:.4}", w.train.sharpe_net),
            &format!("{:.4}", w.test.sharpe_net),
            &format!("{:.4}", w.test.daily_net_bps),
            &format!("{:.4}", w.test.max_drawdown),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for a single run.
///
/// Creates `{run_id}/` under `output_dir` containing:
/// - `summary.json` — headline metrics
/// - `series.csv` — per-bar return/cost/turnover/equity series
///
/// Returns the path to the created directory.
pub fn save_run_artifacts(output: &RunOutput, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(&output.run_id);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(
        run_dir.join("summary.json"),
        export_summary_json(&output.summary)?,
    )?;
    std::fs::write(run_dir.join("series.csv"), export_series_csv(&output.result)?)?;

    Ok(run_dir)
}

/// Save walk-forward artifacts next to a run's outputs.
///
/// Writes `walk_forward.json` and `windows.csv` into `run_dir`.
pub fn save_walk_forward_artifacts(result: &WalkForwardResult, run_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;
    std::fs::write(
        run_dir.join("walk_forward.json"),
        export_walk_forward_json(result)?,
    )?;
    std::fs::write(run_dir.join("windows.csv"), export_windows_csv(result)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use intralab_core::BacktestResult;

    use crate::walk_forward::{WindowResult, WindowSpec};

    fn sample_result() -> BacktestResult {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap();
        BacktestResult {
            timestamps: (0..3).map(|i| start + Duration::minutes(5 * i)).collect(),
            symbols: vec!["AAA".into(), "BBB".into()],
            raw_ret: vec![0.0, 0.001, -0.0005],
            net_ret: vec![0.0, 0.0009, -0.0006],
            cost: vec![0.0, 0.0001, 0.0001],
            turnover: vec![0.0, 1.0, 0.0],
            positions: vec![0.0; 6],
        }
    }

    fn sample_summary() -> Summary {
        Summary::from_result(&sample_result(), 3)
    }

    fn sample_walk_forward() -> WalkForwardResult {
        let spec = WindowSpec {
            index: 0,
            train_start: 0,
            train_end: 10,
            test_start: 12,
            test_end: 17,
        };
        WalkForwardResult {
            windows: vec![WindowResult {
                spec,
                train: sample_summary(),
                test: sample_summary(),
            }],
            combined_test: sample_summary(),
            degradation: 1.0,
        }
    }

    #[test]
    fn series_csv_has_all_columns() {
        let csv = export_series_csv(&sample_result()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4); // header + 3 bars
        assert_eq!(
            lines[0],
            "timestamp,raw_ret,net_ret,cost,turnover,equity"
        );
        assert!(lines[1].starts_with("2024-01-02T14:30:00"));
    }

    #[test]
    fn windows_csv_one_row_per_window() {
        let csv = export_windows_csv(&sample_walk_forward()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("0,0,10,12,17,"));
    }

    #[test]
    fn summary_json_roundtrip() {
        let summary = sample_summary();
        let json = export_summary_json(&summary).unwrap();
        let back: Summary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
    }

    #[test]
    fn artifacts_written_to_run_dir() {
        let output = RunOutput {
            run_id: "deadbeef".into(),
            summary: sample_summary(),
            result: sample_result(),
        };
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_run_artifacts(&output, dir.path()).unwrap();

        assert_eq!(run_dir, dir.path().join("deadbeef"));
        assert!(run_dir.join("summary.json").exists());
        assert!(run_dir.join("series.csv").exists());

        save_walk_forward_artifacts(&sample_walk_forward(), &run_dir).unwrap();
        assert!(run_dir.join("walk_forward.json").exists());
        assert!(run_dir.join("windows.csv").exists());
    }
}
