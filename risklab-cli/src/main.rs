//! RiskLab CLI: backtest and robustness commands.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config over a CSV candle file
//! - `monte-carlo`: backtest, then resample the trade order
//! - `walk-forward`: evaluate train/test windows over the candle file
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use risklab_core::metrics::PerformanceSummary;
use risklab_runner::export::{save_artifacts, write_monte_carlo, write_walk_forward};
use risklab_runner::{
    load_candles, run_backtest, run_monte_carlo, run_walk_forward, BacktestResult,
    DistributionStats, LoadedCandles, MonteCarloReport, RunConfig, WalkForwardReport,
};

#[derive(Parser)]
#[command(
    name = "risklab",
    about = "RiskLab CLI: execution and risk simulation engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by every command.
#[derive(Args)]
struct Inputs {
    /// Path to a TOML run config. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV candle file (timestamp,open,high,low,close,volume).
    #[arg(long)]
    data: PathBuf,

    /// Output directory for artifacts.
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a single backtest.
    Run {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Backtest, then shuffle the closed trades to test ordering luck.
    MonteCarlo {
        #[command(flatten)]
        inputs: Inputs,

        /// Number of permutations (overrides the config).
        #[arg(long)]
        iterations: Option<usize>,

        /// Master seed (overrides the config).
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Rolling or anchored train/test validation.
    WalkForward {
        #[command(flatten)]
        inputs: Inputs,

        /// Anchor every train window at the first candle.
        #[arg(long, default_value_t = false)]
        anchored: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { inputs } => run_cmd(&inputs),
        Commands::MonteCarlo {
            inputs,
            iterations,
            seed,
        } => monte_carlo_cmd(&inputs, iterations, seed),
        Commands::WalkForward { inputs, anchored } => walk_forward_cmd(&inputs, anchored),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_inputs(inputs: &Inputs) -> Result<(RunConfig, LoadedCandles)> {
    let config = match &inputs.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RunConfig::default(),
    };
    let loaded = load_candles(&inputs.data)
        .with_context(|| format!("failed to load candles from {}", inputs.data.display()))?;
    info!(
        candles = loaded.candles.len(),
        dataset = %&loaded.dataset_hash[..12],
        "data loaded"
    );
    Ok((config, loaded))
}

fn backtest(config: &RunConfig, loaded: &LoadedCandles, output_dir: &Path) -> Result<BacktestResult> {
    let result = run_backtest(config, &loaded.candles, Some(&loaded.dataset_hash))
        .context("backtest failed")?;
    print_summary(&result);
    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(result)
}

fn run_cmd(inputs: &Inputs) -> Result<()> {
    let (config, loaded) = load_inputs(inputs)?;
    backtest(&config, &loaded, &inputs.output_dir)?;
    Ok(())
}

fn monte_carlo_cmd(inputs: &Inputs, iterations: Option<usize>, seed: Option<u64>) -> Result<()> {
    let (mut config, loaded) = load_inputs(inputs)?;
    if let Some(n) = iterations {
        config.monte_carlo.iterations = n;
    }
    if seed.is_some() {
        config.monte_carlo.seed = seed;
    }
    config.validate()?;

    let result = backtest(&config, &loaded, &inputs.output_dir)?;
    let report = run_monte_carlo(
        &result.trades,
        config.simulation.initial_capital,
        config.simulation.periods_per_year,
        &config.monte_carlo,
    )
    .context("monte carlo failed")?;
    print_monte_carlo(&report);
    let path = write_monte_carlo(&report, &inputs.output_dir)?;
    println!("Report saved to: {}", path.display());
    Ok(())
}

fn walk_forward_cmd(inputs: &Inputs, anchored: bool) -> Result<()> {
    let (mut config, loaded) = load_inputs(inputs)?;
    if anchored {
        config.walk_forward.anchored = true;
    }
    let report = run_walk_forward(&config, &loaded.candles).context("walk-forward failed")?;
    print_walk_forward(&report);
    let path = write_walk_forward(&report, &inputs.output_dir)?;
    println!("Report saved to: {}", path.display());
    Ok(())
}

fn print_performance(s: &PerformanceSummary) {
    println!("Trades:         {} ({} won, {} lost)", s.total_trades, s.winning_trades, s.losing_trades);
    println!("Net P&L:        {:.2} (fees {:.2})", s.net_pnl, s.total_fees);
    println!("Total Return:   {:.2}%", s.total_return);
    println!("Win Rate:       {:.1}%", s.win_rate);
    println!("Profit Factor:  {:.2}", s.profit_factor);
    println!("Expectancy:     {:.2}", s.expectancy);
    println!("Best / Worst:   {:.2} / {:.2}", s.best_trade, s.worst_trade);
    println!("Max Drawdown:   {:.2}%", s.max_drawdown_pct);
    println!("Sharpe:         {:.3}", s.sharpe_ratio);
    println!("Sortino:        {:.3}", s.sortino_ratio);
    println!("Calmar:         {:.3}", s.calmar_ratio);
    println!("Max Consec Win: {}", s.max_consecutive_wins);
    println!("Max Consec Loss:{}", s.max_consecutive_losses);
}

fn print_summary(result: &BacktestResult) {
    println!();
    println!("=== Backtest Result ===");
    println!("Strategy:       {}", result.strategy);
    println!("Symbol:         {}", result.symbol);
    if let (Some(start), Some(end)) = (result.start, result.end) {
        println!("Period:         {start} to {end}");
    }
    println!("Bars:           {}", result.bar_count);
    println!("Rejected:       {}", result.summary.rejected_trades);
    println!();
    println!("--- Performance ---");
    print_performance(&result.summary.performance);
    println!("Final Capital:  {:.2}", result.final_capital);
}

fn print_distribution(label: &str, d: &DistributionStats) {
    println!(
        "{label:<15} mean {:>9.2}  median {:>9.2}  p5 {:>9.2}  p95 {:>9.2}",
        d.mean, d.median, d.p5, d.p95
    );
}

fn print_monte_carlo(report: &MonteCarloReport) {
    println!();
    println!("=== Monte Carlo ({} permutations, seed {}) ===", report.iterations, report.seed);
    print_distribution("Return %:", &report.return_stats);
    print_distribution("Max DD %:", &report.drawdown_stats);
    print_distribution("Sharpe:", &report.sharpe_stats);
    print_distribution("Final Equity:", &report.final_equity_stats);
    println!("Profitable:     {:.1}%", report.profitable_pct);
    println!(
        "Ruin (< {:.0}%): {:.1}%",
        report.ruin_threshold_pct,
        report.ruin_probability * 100.0
    );
}

fn print_walk_forward(report: &WalkForwardReport) {
    println!();
    println!(
        "=== Walk-Forward ({}, {} windows, {} skipped) ===",
        if report.anchored { "anchored" } else { "rolling" },
        report.windows.len(),
        report.skipped.len()
    );
    for w in &report.windows {
        println!(
            "#{:<3} {} .. {}  train {:>7.2}%  test {:>7.2}%  eff {:>6.2}",
            w.bounds.index,
            w.bounds.test_start.format("%Y-%m-%d"),
            w.bounds.test_end.format("%Y-%m-%d"),
            w.train.total_return,
            w.test.total_return,
            w.efficiency_ratio
        );
    }
    println!();
    println!("Avg Train:      {:.2}%", report.train.avg_return);
    println!("Avg Test:       {:.2}%", report.test.avg_return);
    println!("Degradation:    {:.1}%", report.degradation_pct);
    println!(
        "Profitable:     {}/{}",
        report.profitable_test_windows,
        report.windows.len()
    );
    println!("Efficient:      {}/{}", report.efficient_windows, report.windows.len());
}
