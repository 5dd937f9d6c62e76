//! RiskLab Runner: backtest orchestration and robustness validation.
//!
//! This crate builds on `risklab-core` to provide:
//! - TOML run configuration and CSV candle loading
//! - Single-backtest runner with content-addressed run ids
//! - Monte Carlo trade-order resampling
//! - Walk-forward train/test validation
//! - JSON and CSV artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod monte_carlo;
pub mod runner;
pub mod stats;
pub mod walk_forward;

pub use config::{ConfigError, RunConfig, RunId, ScriptedSignal, StrategyConfig};
pub use data_loader::{load_candles, read_candles, LoadError, LoadedCandles};
pub use monte_carlo::{
    run_monte_carlo, MonteCarloConfig, MonteCarloError, MonteCarloReport, PermutationSample,
};
pub use runner::{run_backtest, simulate, BacktestResult, BacktestSummary, RunError};
pub use stats::DistributionStats;
pub use walk_forward::{
    generate_windows, run_walk_forward, WalkForwardConfig, WalkForwardError, WalkForwardReport,
    WindowResult, WindowBounds,
};
