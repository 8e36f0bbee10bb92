//! IntraLab CLI — single-run and walk-forward commands.
//!
//! Commands:
//! - `run` — execute one backtest from a TOML config file
//! - `walk-forward` — evaluate a config across rolling train/test windows

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use intralab_core::data::load_panel;
use intralab_runner::export::{
    save_run_artifacts, save_walk_forward_artifacts,
};
use intralab_runner::{run_single, run_walk_forward, RunConfig, Summary, WalkForwardResult};

#[derive(Parser)]
#[command(
    name = "intralab",
    about = "IntraLab CLI — intraday cross-sectional backtesting engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a single backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Override the data file from the config.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Output directory for result artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary as JSON instead of the text report.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Evaluate a config across rolling train/test windows with embargo.
    WalkForward {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Override the data file from the config.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Output directory for result artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the aggregate as JSON instead of the text report.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            data,
            output_dir,
            json,
        } => run_cmd(&config, data, &output_dir, json),
        Commands::WalkForward {
            config,
            data,
            output_dir,
            json,
        } => walk_forward_cmd(&config, data, &output_dir, json),
    }
}

fn load_run_config(config_path: &std::path::Path, data: Option<PathBuf>) -> Result<RunConfig> {
    let mut config = RunConfig::load(config_path)?;
    if let Some(path) = data {
        config.data.path = path.display().to_string();
    }
    if config.data.path.is_empty() {
        bail!("no data file: set [data] path in the config or pass --data");
    }
    Ok(config)
}

fn run_cmd(
    config_path: &std::path::Path,
    data: Option<PathBuf>,
    output_dir: &std::path::Path,
    json: bool,
) -> Result<()> {
    let config = load_run_config(config_path, data)?;
    let panel = load_panel(
        std::path::Path::new(&config.data.path),
        config.data.min_price,
        config.data.universe_size,
    )
    .with_context(|| format!("failed to load panel from {}", config.data.path))?;

    let output = run_single(&panel, &config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output.summary)?);
    } else {
        print_summary(&output.run_id, &output.summary);
    }

    let run_dir = save_run_artifacts(&output, output_dir)?;
    eprintln!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn walk_forward_cmd(
    config_path: &std::path::Path,
    data: Option<PathBuf>,
    output_dir: &std::path::Path,
    json: bool,
) -> Result<()> {
    let config = load_run_config(config_path, data)?;
    let panel = load_panel(
        std::path::Path::new(&config.data.path),
        config.data.min_price,
        config.data.universe_size,
    )
    .with_context(|| format!("failed to load panel from {}", config.data.path))?;

    let result = run_walk_forward(&panel, &config.backtest, &config.walk_forward)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_walk_forward(&config.run_id(), &result);
    }

    let run_dir = output_dir.join(config.run_id());
    save_walk_forward_artifacts(&result, &run_dir)?;
    eprintln!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn print_summary(run_id: &str, summary: &Summary) {
    println!();
    println!("=== Backtest Result ===");
    println!("Run ID:          {}", &run_id[..run_id.len().min(16)]);
    println!(
        "Bars:            {} ({} per day)",
        summary.n_bars, summary.bars_per_day
    );
    println!();
    println!("--- Performance ---");
    println!("Sharpe (raw):    {:.3}", summary.sharpe_raw);
    println!("Sharpe (net):    {:.3}", summary.sharpe_net);
    println!(
        "Annual Return:   {:.2}%",
        summary.annual_return_net * 100.0
    );
    println!("Max Drawdown:    {:.2}%", summary.max_drawdown * 100.0);
    println!("Daily PnL (raw): {:.2} bps", summary.daily_raw_bps);
    println!("Daily PnL (net): {:.2} bps", summary.daily_net_bps);
    println!("Daily Vol:       {:.2} bps", summary.daily_vol_bps);
    println!("Turnover/Day:    {:.2}x", summary.turnover_per_day);
    println!("Cost/Day:        {:.2} bps", summary.cost_per_day_bps);
    println!();
}

fn print_walk_forward(run_id: &str, result: &WalkForwardResult) {
    println!();
    println!("=== Walk-Forward Result ===");
    println!("Run ID:          {}", &run_id[..run_id.len().min(16)]);
    println!("Windows:         {}", result.windows.len());
    println!();
    println!(
        "{:<8} {:>14} {:>14} {:>14} {:>14}",
        "Window", "Train Sharpe", "Test Sharpe", "Test Net/Day", "Test MaxDD"
    );
    for w in &result.windows {
        println!(
            "{:<8} {:>14.3} {:>14.3} {:>11.2}bps {:>13.2}%",
            w.spec.index,
            w.train.sharpe_net,
            w.test.sharpe_net,
            w.test.daily_net_bps,
            w.test.max_drawdown * 100.0
        );
    }
    println!();
    println!("--- Combined Out-of-Sample ---");
    println!("Sharpe (net):    {:.3}", result.combined_test.sharpe_net);
    println!(
        "Daily PnL (net): {:.2} bps",
        result.combined_test.daily_net_bps
    );
    println!(
        "Max Drawdown:    {:.2}%",
        result.combined_test.max_drawdown * 100.0
    );
    println!("Degradation:     {:.2}", result.degradation);
    println!();
}
