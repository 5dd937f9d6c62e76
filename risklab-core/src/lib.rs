//! RiskLab Core: domain types, execution simulator, risk policy chain, metrics.
//!
//! This crate contains the engine:
//! - Domain types (candles, signals, orders, positions, closed trades, rejections)
//! - Strategy trait plus reference strategies
//! - Risk policy chain with a shared circuit breaker and adaptive limits
//! - Bar-by-bar execution simulator
//! - Metrics aggregator and pure metric functions
//! - Deterministic RNG hierarchy for parallel workers

pub mod domain;
pub mod engine;
pub mod metrics;
pub mod risk;
pub mod rng;
pub mod strategy;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed to rayon workers are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::Signal>();
        require_sync::<domain::Signal>();
        require_send::<domain::OrderRequest>();
        require_sync::<domain::OrderRequest>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::ClosedTrade>();
        require_sync::<domain::ClosedTrade>();
        require_send::<domain::RejectedOrder>();
        require_sync::<domain::RejectedOrder>();

        // Metrics
        require_send::<metrics::MetricsAggregator>();
        require_sync::<metrics::MetricsAggregator>();
        require_send::<metrics::PerformanceSummary>();
        require_sync::<metrics::PerformanceSummary>();

        // Risk
        require_send::<risk::CircuitBreaker>();
        require_sync::<risk::CircuitBreaker>();
        require_send::<risk::RiskManager>();
        require_sync::<risk::RiskManager>();
        require_send::<risk::AdaptiveLimits>();
        require_sync::<risk::AdaptiveLimits>();

        // Engine
        require_send::<engine::SimulatorConfig>();
        require_sync::<engine::SimulatorConfig>();
        require_send::<engine::Simulator>();
        require_send::<engine::SimulationReport>();
        require_sync::<engine::SimulationReport>();
        require_send::<rng::RngHierarchy>();
        require_sync::<rng::RngHierarchy>();
    }
}
