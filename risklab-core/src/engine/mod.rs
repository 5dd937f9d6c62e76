//! Execution engine: configuration, costs and the bar-by-bar simulator.
//!
//! The simulator owns capital, the single open position and the metrics
//! aggregator. It borrows the strategy per run and owns its risk chain;
//! the chain's circuit breaker may be shared with other simulators.

pub mod config;
pub mod costs;
pub mod simulator;

pub use config::{ConfigError, SimulatorConfig};
pub use costs::CostModel;
pub use simulator::{
    SimulationCounters, SimulationError, SimulationReport, SimulationSnapshot, Simulator,
};
