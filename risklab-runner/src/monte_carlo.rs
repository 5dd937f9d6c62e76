//! Monte Carlo trade-order resampling.
//!
//! Shuffles the closed-trade list of one simulation `iterations` times
//! (permutation without replacement) and replays each order through a fresh
//! metrics aggregator at the same initial capital. Net P&L is identical for
//! every permutation; drawdown and Sharpe depend on the order and show how
//! much of the original result was sequencing luck.
//!
//! Each permutation draws from its own `StdRng`, seeded from
//! `(master_seed, permutation_index)` through the BLAKE3 RNG hierarchy, so a
//! fixed seed yields identical output whether run sequentially or on rayon.

use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use risklab_core::domain::ClosedTrade;
use risklab_core::metrics::MetricsAggregator;
use risklab_core::rng::RngHierarchy;

use crate::stats::DistributionStats;

const PERMUTATION_STREAM: &str = "permutation";

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Number of permutations (default 1000).
    pub iterations: usize,
    /// Master seed. `None` draws one from the OS and records it in the report.
    pub seed: Option<u64>,
    /// Return (percent) below which a permutation counts as ruin.
    pub ruin_threshold_pct: f64,
    /// Run permutations on the rayon pool.
    pub parallel: bool,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            seed: None,
            ruin_threshold_pct: -20.0,
            parallel: true,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Metrics of one trade ordering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PermutationSample {
    pub final_equity: f64,
    pub net_pnl: f64,
    pub total_return: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    pub win_rate: f64,
    #[serde(with = "risklab_core::domain::ratio")]
    pub profit_factor: f64,
}

impl PermutationSample {
    fn from_aggregator(agg: &MetricsAggregator) -> Self {
        let s = agg.summary();
        Self {
            final_equity: s.final_equity,
            net_pnl: s.net_pnl,
            total_return: s.total_return,
            max_drawdown_pct: s.max_drawdown_pct,
            sharpe_ratio: s.sharpe_ratio,
            win_rate: s.win_rate,
            profit_factor: s.profit_factor,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloReport {
    pub iterations: usize,
    /// Master seed actually used.
    pub seed: u64,
    pub initial_capital: f64,
    pub trade_count: usize,
    /// The un-permuted trade order.
    pub original: PermutationSample,
    /// Percentage (0–100) of permutations ending with a positive return.
    pub profitable_pct: f64,
    /// Fraction (0–1) of permutations whose return fell below the ruin threshold.
    pub ruin_probability: f64,
    pub ruin_threshold_pct: f64,
    pub return_stats: DistributionStats,
    pub drawdown_stats: DistributionStats,
    pub sharpe_stats: DistributionStats,
    pub final_equity_stats: DistributionStats,
    /// Per-permutation metrics, in permutation-index order.
    pub samples: Vec<PermutationSample>,
}

#[derive(Debug, Error, PartialEq)]
pub enum MonteCarloError {
    #[error("no trades to resample")]
    NoTrades,
    #[error("iterations must be > 0, got {0}")]
    InvalidIterations(usize),
}

// ─── Resampling ──────────────────────────────────────────────────────

/// Replay `trades` in permutation `index` of the hierarchy.
fn permutation(
    trades: &[ClosedTrade],
    initial_capital: f64,
    periods_per_year: f64,
    hierarchy: &RngHierarchy,
    index: usize,
) -> PermutationSample {
    let mut rng = hierarchy.rng_for(PERMUTATION_STREAM, index as u64);
    let mut order: Vec<&ClosedTrade> = trades.iter().collect();
    order.shuffle(&mut rng);
    let agg = MetricsAggregator::from_trades(
        initial_capital,
        periods_per_year,
        order.into_iter().cloned(),
    );
    PermutationSample::from_aggregator(&agg)
}

/// Run the resampling validator over a finished simulation's trades.
pub fn run_monte_carlo(
    trades: &[ClosedTrade],
    initial_capital: f64,
    periods_per_year: f64,
    config: &MonteCarloConfig,
) -> Result<MonteCarloReport, MonteCarloError> {
    if config.iterations == 0 {
        return Err(MonteCarloError::InvalidIterations(config.iterations));
    }
    if trades.is_empty() {
        return Err(MonteCarloError::NoTrades);
    }

    let hierarchy = config
        .seed
        .map_or_else(RngHierarchy::from_entropy, RngHierarchy::new);

    let samples: Vec<PermutationSample> = if config.parallel {
        (0..config.iterations)
            .into_par_iter()
            .map(|i| permutation(trades, initial_capital, periods_per_year, &hierarchy, i))
            .collect()
    } else {
        (0..config.iterations)
            .map(|i| permutation(trades, initial_capital, periods_per_year, &hierarchy, i))
            .collect()
    };

    let original = PermutationSample::from_aggregator(&MetricsAggregator::from_trades(
        initial_capital,
        periods_per_year,
        trades.iter().cloned(),
    ));

    let report = summarize(
        samples,
        original,
        hierarchy.master_seed(),
        initial_capital,
        trades.len(),
        config.ruin_threshold_pct,
    );
    info!(
        iterations = report.iterations,
        seed = report.seed,
        profitable_pct = report.profitable_pct,
        ruin_probability = report.ruin_probability,
        median_return = report.return_stats.median,
        "monte carlo complete"
    );
    Ok(report)
}

fn summarize(
    samples: Vec<PermutationSample>,
    original: PermutationSample,
    seed: u64,
    initial_capital: f64,
    trade_count: usize,
    ruin_threshold_pct: f64,
) -> MonteCarloReport {
    let n = samples.len() as f64;
    let returns: Vec<f64> = samples.iter().map(|s| s.total_return).collect();
    let drawdowns: Vec<f64> = samples.iter().map(|s| s.max_drawdown_pct).collect();
    let sharpes: Vec<f64> = samples.iter().map(|s| s.sharpe_ratio).collect();
    let equities: Vec<f64> = samples.iter().map(|s| s.final_equity).collect();

    let profitable = returns.iter().filter(|&&r| r > 0.0).count() as f64;
    let ruined = returns.iter().filter(|&&r| r < ruin_threshold_pct).count() as f64;

    MonteCarloReport {
        iterations: samples.len(),
        seed,
        initial_capital,
        trade_count,
        original,
        profitable_pct: profitable / n * 100.0,
        ruin_probability: ruined / n,
        ruin_threshold_pct,
        return_stats: DistributionStats::from_values(&returns),
        drawdown_stats: DistributionStats::from_values(&drawdowns),
        sharpe_stats: DistributionStats::from_values(&sharpes),
        final_equity_stats: DistributionStats::from_values(&equities),
        samples,
    }
}
