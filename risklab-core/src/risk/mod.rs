//! Risk layer: composable pre-trade policies, a shared circuit breaker,
//! adaptive limits and the coordinator that folds them.

pub mod adaptive;
pub mod circuit_breaker;
pub mod manager;
pub mod policies;
pub mod policy;

pub use adaptive::{AdaptiveLimits, AdaptiveLimitsConfig, DrawdownState, RiskBudget, VolatilityRegime};
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use manager::{PolicyOutcome, RiskDecision, RiskLimits, RiskManager};
pub use policies::{
    ExchangeMarginLevel, FundingRateLimit, MarginSufficiency, MaxDailyDrawdown, MaxLeverage,
    MaxPositionSize, StopLossRule,
};
pub use policy::{
    exceeds_limit, BalanceSnapshot, CheckOutcome, FundingSnapshot, RiskContext, RiskPolicy,
    Verdict, LIMIT_TOLERANCE,
};
