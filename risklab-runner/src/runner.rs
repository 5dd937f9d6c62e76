//! Backtest runner: wires together config, risk chain, strategy and simulator.
//!
//! Two entry points:
//! - `run_backtest()`: validates a `RunConfig` and runs it over loaded candles. Used by CLI.
//! - `simulate()`: runs one simulator over a candle slice with a caller-owned
//!   strategy and breaker. Used by walk-forward windows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use risklab_core::domain::{Candle, ClosedTrade, RejectedOrder};
use risklab_core::engine::{SimulationCounters, SimulationError, SimulationReport, Simulator, SimulatorConfig};
use risklab_core::metrics::PerformanceSummary;
use risklab_core::risk::{CircuitBreaker, RiskManager};
use risklab_core::strategy::{Strategy, StrategyError};

use crate::config::{ConfigError, RunConfig, RunId};
use crate::data_loader::LoadError;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Performance summary plus the count of entries the risk chain refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    #[serde(flatten)]
    pub performance: PerformanceSummary,
    pub rejected_trades: usize,
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub dataset_hash: Option<String>,
    pub strategy: String,
    pub symbol: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub bar_count: usize,
    pub summary: BacktestSummary,
    pub trades: Vec<ClosedTrade>,
    pub rejections: Vec<RejectedOrder>,
    pub equity_curve: Vec<f64>,
    pub final_capital: f64,
    pub counters: SimulationCounters,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run one simulator over `candles` with the standard risk chain built from
/// `config.risk`, observing `breaker`.
pub fn simulate(
    simulation: &SimulatorConfig,
    config: &RunConfig,
    candles: &[Candle],
    strategy: &mut dyn Strategy,
    breaker: Arc<CircuitBreaker>,
) -> Result<SimulationReport, RunError> {
    let risk = RiskManager::standard(breaker, &config.risk);
    let mut sim = Simulator::new(simulation.clone(), risk).map_err(ConfigError::from)?;
    Ok(sim.run(candles, strategy)?)
}

/// Validate `config` and run a full backtest over `candles`.
pub fn run_backtest(
    config: &RunConfig,
    candles: &[Candle],
    dataset_hash: Option<&str>,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let mut strategy = config.strategy.build()?;
    let report = simulate(
        &config.simulation,
        config,
        candles,
        strategy.as_mut(),
        CircuitBreaker::shared(),
    )?;

    info!(
        strategy = strategy.name(),
        symbol = %config.simulation.symbol,
        trades = report.summary.total_trades,
        rejected = report.rejected_trades,
        final_capital = report.final_capital,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        dataset_hash: dataset_hash.map(str::to_string),
        strategy: strategy.name().to_string(),
        symbol: config.simulation.symbol.clone(),
        start: candles.first().map(|c| c.timestamp),
        end: candles.last().map(|c| c.timestamp),
        bar_count: candles.len(),
        summary: BacktestSummary {
            performance: report.summary,
            rejected_trades: report.rejected_trades,
        },
        trades: report.trades,
        rejections: report.rejections,
        equity_curve: report.equity_curve,
        final_capital: report.final_capital,
        counters: report.counters,
    })
}
