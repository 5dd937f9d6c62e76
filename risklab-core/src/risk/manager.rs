//! RiskManager: folds every policy over an order and aggregates verdicts.
//!
//! All policies are evaluated even after a rejection so the audit record
//! carries the complete picture. An order is approved iff no policy
//! rejected it and the circuit breaker is closed.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::adaptive::{AdaptiveLimits, AdaptiveLimitsConfig};
use super::circuit_breaker::CircuitBreaker;
use super::policies::{
    ExchangeMarginLevel, FundingRateLimit, MarginSufficiency, MaxDailyDrawdown, MaxLeverage,
    MaxPositionSize, StopLossRule,
};
use super::policy::{CheckOutcome, RiskContext, RiskPolicy, Verdict};
use crate::domain::{OrderRequest, Position};

/// Thresholds for the standard policy chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Max notional as a fraction of capital.
    pub max_position_fraction: f64,
    pub max_leverage: f64,
    pub max_daily_drawdown: f64,
    pub margin_reject_ratio: f64,
    pub margin_warn_ratio: f64,
    /// Include the exchange margin-level and funding-rate policies.
    pub exchange_checks: bool,
    pub min_margin_level: f64,
    pub critical_margin_level: f64,
    pub max_funding_rate: f64,
    /// Position-level stop enforced by the risk layer.
    pub stop_loss_pct: Option<f64>,
    pub adaptive: Option<AdaptiveLimitsConfig>,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_fraction: 0.10,
            max_leverage: 10.0,
            max_daily_drawdown: 0.05,
            margin_reject_ratio: 0.95,
            margin_warn_ratio: 0.70,
            exchange_checks: false,
            min_margin_level: 1.5,
            critical_margin_level: 1.1,
            max_funding_rate: 0.001,
            stop_loss_pct: None,
            adaptive: None,
        }
    }
}

/// One policy's contribution to a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyOutcome {
    pub policy: String,
    pub verdict: Verdict,
    pub message: String,
}

impl PolicyOutcome {
    fn new(policy: impl Into<String>, outcome: CheckOutcome) -> Self {
        Self {
            policy: policy.into(),
            verdict: outcome.verdict,
            message: outcome.message,
        }
    }
}

/// Aggregated result of running the full chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDecision {
    pub approved: bool,
    pub outcomes: Vec<PolicyOutcome>,
}

impl RiskDecision {
    /// Messages of every non-approved outcome joined with `"; "`.
    pub fn reasons(&self) -> String {
        self.outcomes
            .iter()
            .filter(|o| o.verdict != Verdict::Approved)
            .map(|o| o.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn warnings(&self) -> impl Iterator<Item = &PolicyOutcome> {
        self.outcomes.iter().filter(|o| o.verdict == Verdict::Warning)
    }

    pub fn rejections(&self) -> impl Iterator<Item = &PolicyOutcome> {
        self.outcomes.iter().filter(|o| o.verdict == Verdict::Rejected)
    }
}

pub struct RiskManager {
    policies: Vec<Box<dyn RiskPolicy>>,
    breaker: Arc<CircuitBreaker>,
    adaptive: Option<AdaptiveLimits>,
    stop_loss: Option<StopLossRule>,
}

impl std::fmt::Debug for RiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskManager")
            .field(
                "policies",
                &self.policies.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("breaker", &self.breaker.state())
            .field("adaptive", &self.adaptive.is_some())
            .field("stop_loss", &self.stop_loss)
            .finish()
    }
}

impl RiskManager {
    /// Empty chain observing `breaker`.
    pub fn new(breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            policies: Vec::new(),
            breaker,
            adaptive: None,
            stop_loss: None,
        }
    }

    /// The standard chain built from `limits`.
    pub fn standard(breaker: Arc<CircuitBreaker>, limits: &RiskLimits) -> Self {
        let mut manager = Self::new(breaker)
            .with_policy(MaxPositionSize::new(limits.max_position_fraction))
            .with_policy(MaxLeverage::new(limits.max_leverage))
            .with_policy(MaxDailyDrawdown::new(limits.max_daily_drawdown))
            .with_policy(MarginSufficiency::new(
                limits.margin_reject_ratio,
                limits.margin_warn_ratio,
            ));
        if limits.exchange_checks {
            manager = manager
                .with_policy(ExchangeMarginLevel::new(
                    limits.min_margin_level,
                    limits.critical_margin_level,
                ))
                .with_policy(FundingRateLimit::new(limits.max_funding_rate));
        }
        if let Some(pct) = limits.stop_loss_pct {
            manager = manager.with_stop_loss(StopLossRule::new(pct));
        }
        if let Some(config) = &limits.adaptive {
            manager = manager.with_adaptive_limits(AdaptiveLimits::new(config.clone()));
        }
        manager
    }

    pub fn with_policy(mut self, policy: impl RiskPolicy + 'static) -> Self {
        self.add_policy(Box::new(policy));
        self
    }

    pub fn add_policy(&mut self, policy: Box<dyn RiskPolicy>) {
        self.policies.push(policy);
    }

    pub fn with_adaptive_limits(mut self, adaptive: AdaptiveLimits) -> Self {
        self.adaptive = Some(adaptive);
        self
    }

    pub fn with_stop_loss(mut self, rule: StopLossRule) -> Self {
        self.stop_loss = Some(rule);
        self
    }

    pub fn policy_names(&self) -> Vec<&str> {
        self.policies.iter().map(|p| p.name()).collect()
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn adaptive_limits(&self) -> Option<&AdaptiveLimits> {
        self.adaptive.as_ref()
    }

    pub fn trigger_circuit_breaker(&self, reason: impl Into<String>) {
        self.breaker.trigger(reason);
    }

    pub fn reset_circuit_breaker(&self) {
        self.breaker.reset();
    }

    /// Push the latest capital into the adaptive limits, if configured.
    pub fn observe_capital(&mut self, capital: f64, today: NaiveDate) {
        if let Some(adaptive) = self.adaptive.as_mut() {
            adaptive.observe(capital, today, &self.breaker);
        }
    }

    /// Position-level stop check. `None` when no stop rule is configured.
    pub fn check_position(&self, position: &Position, current_price: f64) -> Option<CheckOutcome> {
        self.stop_loss
            .as_ref()
            .map(|rule| rule.check(position, current_price))
    }

    /// Run the whole chain over `order`.
    pub fn validate_order(&mut self, order: &OrderRequest, context: &RiskContext) -> RiskDecision {
        let mut outcomes = Vec::with_capacity(self.policies.len() + 2);

        if let Some(reason) = self.breaker.reason() {
            outcomes.push(PolicyOutcome::new(
                "circuit_breaker",
                CheckOutcome::rejected(format!("Circuit breaker active: {reason}")),
            ));
        }

        for policy in self.policies.iter_mut() {
            let outcome = policy.check(order, context);
            outcomes.push(PolicyOutcome::new(policy.name(), outcome));
        }

        if let Some(adaptive) = self.adaptive.as_ref() {
            outcomes.push(PolicyOutcome::new(
                "adaptive_limits",
                adaptive.check(order, context),
            ));
        }

        let approved = outcomes.iter().all(|o| o.verdict != Verdict::Rejected);
        let decision = RiskDecision { approved, outcomes };

        if approved {
            if let Some(adaptive) = self.adaptive.as_mut() {
                let risk = match context.stop_loss_pct {
                    Some(pct) if pct > 0.0 => order.notional() * pct,
                    _ => order.notional(),
                };
                adaptive.consume(risk);
            }
            for w in decision.warnings() {
                warn!(policy = %w.policy, message = %w.message, "risk warning");
            }
            debug!(side = %order.side, amount = order.amount, price = order.price, "order approved");
        } else {
            warn!(
                side = %order.side,
                price = order.price,
                reasons = %decision.reasons(),
                "order rejected"
            );
        }
        decision
    }
}
