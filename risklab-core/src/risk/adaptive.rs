//! Adaptive limits: position-size ceilings that shrink with volatility and
//! drawdown, plus a per-day risk budget.
//!
//! Drawdown ladder (fractions of peak capital):
//! - below `drawdown_reduce_threshold`: full size
//! - up to `drawdown_block_threshold`: 75% size
//! - at or above `drawdown_block_threshold`: no new entries
//! - at or above `drawdown_emergency_threshold`: circuit breaker trips

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::circuit_breaker::CircuitBreaker;
use super::policy::{exceeds_limit, CheckOutcome, RiskContext};
use crate::domain::OrderRequest;

/// Volatility classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolatilityRegime {
    Normal,
    HighVolatility,
    ExtremeVolatility,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveLimitsConfig {
    pub high_volatility_threshold: f64,
    pub extreme_volatility_threshold: f64,
    pub normal_max_fraction: f64,
    pub high_volatility_max_fraction: f64,
    pub extreme_volatility_max_fraction: f64,
    pub drawdown_reduce_threshold: f64,
    pub drawdown_block_threshold: f64,
    pub drawdown_emergency_threshold: f64,
    /// Daily risk ceiling as a fraction of the day's starting capital.
    pub daily_risk_fraction: f64,
}

impl Default for AdaptiveLimitsConfig {
    fn default() -> Self {
        Self {
            high_volatility_threshold: 0.03,
            extreme_volatility_threshold: 0.06,
            normal_max_fraction: 0.10,
            high_volatility_max_fraction: 0.05,
            extreme_volatility_max_fraction: 0.02,
            drawdown_reduce_threshold: 0.05,
            drawdown_block_threshold: 0.10,
            drawdown_emergency_threshold: 0.15,
            daily_risk_fraction: 0.02,
        }
    }
}

/// Risk consumed on one calendar day versus its ceiling.
///
/// `used` never decreases within a day; a new date replaces the whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBudget {
    pub date: NaiveDate,
    pub ceiling: f64,
    pub used: f64,
}

impl RiskBudget {
    pub fn new(date: NaiveDate, ceiling: f64) -> Self {
        Self {
            date,
            ceiling,
            used: 0.0,
        }
    }

    pub fn remaining(&self) -> f64 {
        (self.ceiling - self.used).max(0.0)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.ceiling
    }

    pub fn consume(&mut self, risk: f64) {
        if risk.is_finite() && risk > 0.0 {
            self.used += risk;
        }
    }
}

/// Running peak and current capital.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownState {
    pub peak: f64,
    pub current: f64,
}

impl DrawdownState {
    pub fn new(capital: f64) -> Self {
        Self {
            peak: capital,
            current: capital,
        }
    }

    pub fn update(&mut self, capital: f64) {
        self.current = capital;
        if capital > self.peak {
            self.peak = capital;
        }
    }

    /// `(peak - current) / peak` while below the peak, else 0.
    pub fn current_drawdown(&self) -> f64 {
        if self.current < self.peak && self.peak > 0.0 {
            (self.peak - self.current) / self.peak
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdaptiveLimits {
    config: AdaptiveLimitsConfig,
    budget: Option<RiskBudget>,
    drawdown: Option<DrawdownState>,
}

impl AdaptiveLimits {
    pub fn new(config: AdaptiveLimitsConfig) -> Self {
        Self {
            config,
            budget: None,
            drawdown: None,
        }
    }

    pub fn config(&self) -> &AdaptiveLimitsConfig {
        &self.config
    }

    pub fn budget(&self) -> Option<&RiskBudget> {
        self.budget.as_ref()
    }

    pub fn drawdown_state(&self) -> Option<&DrawdownState> {
        self.drawdown.as_ref()
    }

    /// Feed the latest capital and the caller's current date.
    ///
    /// Replaces the risk budget when the date changed and trips `breaker`
    /// when drawdown reaches the emergency threshold.
    pub fn observe(&mut self, capital: f64, today: NaiveDate, breaker: &CircuitBreaker) {
        match self.drawdown.as_mut() {
            Some(state) => state.update(capital),
            None => self.drawdown = Some(DrawdownState::new(capital)),
        }

        if self.budget.as_ref().map(|b| b.date) != Some(today) {
            let ceiling = capital.max(0.0) * self.config.daily_risk_fraction;
            self.budget = Some(RiskBudget::new(today, ceiling));
        }

        let drawdown = self.current_drawdown();
        if drawdown >= self.config.drawdown_emergency_threshold && !breaker.is_triggered() {
            warn!(
                drawdown_pct = drawdown * 100.0,
                threshold_pct = self.config.drawdown_emergency_threshold * 100.0,
                "adaptive limits emergency exit"
            );
            breaker.trigger(format!(
                "Emergency exit: drawdown {:.2}% reached {:.2}%",
                drawdown * 100.0,
                self.config.drawdown_emergency_threshold * 100.0
            ));
        }
    }

    pub fn current_drawdown(&self) -> f64 {
        self.drawdown.map_or(0.0, |d| d.current_drawdown())
    }

    pub fn classify(&self, volatility: f64) -> VolatilityRegime {
        if volatility >= self.config.extreme_volatility_threshold {
            VolatilityRegime::ExtremeVolatility
        } else if volatility >= self.config.high_volatility_threshold {
            VolatilityRegime::HighVolatility
        } else {
            VolatilityRegime::Normal
        }
    }

    fn regime_max_fraction(&self, regime: VolatilityRegime) -> f64 {
        match regime {
            VolatilityRegime::Normal => self.config.normal_max_fraction,
            VolatilityRegime::HighVolatility => self.config.high_volatility_max_fraction,
            VolatilityRegime::ExtremeVolatility => self.config.extreme_volatility_max_fraction,
        }
    }

    /// 1.0 below the reduce threshold, 0.75 up to the block threshold, 0.0 beyond.
    pub fn drawdown_multiplier(&self) -> f64 {
        let drawdown = self.current_drawdown();
        if drawdown >= self.config.drawdown_block_threshold {
            0.0
        } else if drawdown >= self.config.drawdown_reduce_threshold {
            0.75
        } else {
            1.0
        }
    }

    /// Largest order amount (base units) allowed at `price`.
    pub fn max_position_size(&self, capital: f64, price: f64, volatility: Option<f64>) -> f64 {
        if price <= 0.0 || capital <= 0.0 {
            return 0.0;
        }
        let regime = volatility.map_or(VolatilityRegime::Normal, |v| self.classify(v));
        capital * self.regime_max_fraction(regime) * self.drawdown_multiplier() / price
    }

    pub fn remaining_budget(&self) -> f64 {
        self.budget.as_ref().map_or(0.0, RiskBudget::remaining)
    }

    pub fn consume(&mut self, risk: f64) {
        if let Some(budget) = self.budget.as_mut() {
            budget.consume(risk);
        }
    }

    /// Evaluate an entry against the current limits.
    pub fn check(&self, order: &OrderRequest, context: &RiskContext) -> CheckOutcome {
        let multiplier = self.drawdown_multiplier();
        if multiplier == 0.0 {
            return CheckOutcome::rejected(format!(
                "New entries blocked: drawdown {:.2}% at or above {:.2}%",
                self.current_drawdown() * 100.0,
                self.config.drawdown_block_threshold * 100.0
            ));
        }
        if self.budget.as_ref().is_some_and(RiskBudget::is_exhausted) {
            return CheckOutcome::rejected("Daily risk budget exhausted");
        }

        let max_size = self.max_position_size(context.capital, order.price, context.volatility);
        if exceeds_limit(order.amount, max_size) {
            return CheckOutcome::rejected(format!(
                "Order amount {:.6} exceeds adaptive limit {:.6}",
                order.amount, max_size
            ));
        }
        if multiplier < 1.0 {
            CheckOutcome::warning(format!(
                "Position size reduced to {:.0}% during {:.2}% drawdown",
                multiplier * 100.0,
                self.current_drawdown() * 100.0
            ))
        } else {
            CheckOutcome::approved(format!("Adaptive limit {max_size:.6}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderSide;
    use crate::risk::policy::Verdict;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn limits() -> AdaptiveLimits {
        AdaptiveLimits::new(AdaptiveLimitsConfig::default())
    }

    fn order(amount: f64) -> OrderRequest {
        OrderRequest {
            symbol: "ETH/USDT".into(),
            side: OrderSide::Buy,
            amount,
            price: 100.0,
            leverage: 1.0,
        }
    }

    #[test]
    fn classifies_volatility_regimes() {
        let l = limits();
        assert_eq!(l.classify(0.01), VolatilityRegime::Normal);
        assert_eq!(l.classify(0.03), VolatilityRegime::HighVolatility);
        assert_eq!(l.classify(0.08), VolatilityRegime::ExtremeVolatility);
    }

    #[test]
    fn drawdown_ladder() {
        let breaker = CircuitBreaker::new();
        let mut l = limits();
        l.observe(10_000.0, day(1), &breaker);
        assert_eq!(l.drawdown_multiplier(), 1.0);

        l.observe(9_400.0, day(1), &breaker); // 6%
        assert_eq!(l.drawdown_multiplier(), 0.75);

        l.observe(9_000.0, day(1), &breaker); // 10%
        assert_eq!(l.drawdown_multiplier(), 0.0);
        assert!(!breaker.is_triggered());

        l.observe(8_500.0, day(1), &breaker); // 15%
        assert!(breaker.is_triggered());
        assert!(breaker.reason().unwrap().contains("Emergency exit"));
    }

    #[test]
    fn peak_never_decreases() {
        let breaker = CircuitBreaker::new();
        let mut l = limits();
        l.observe(10_000.0, day(1), &breaker);
        l.observe(12_000.0, day(1), &breaker);
        l.observe(11_000.0, day(1), &breaker);
        let state = l.drawdown_state().unwrap();
        assert_eq!(state.peak, 12_000.0);
        assert!((l.current_drawdown() - 1.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn max_position_size_by_regime_and_drawdown() {
        let breaker = CircuitBreaker::new();
        let mut l = limits();
        l.observe(10_000.0, day(1), &breaker);
        assert!((l.max_position_size(10_000.0, 100.0, None) - 10.0).abs() < 1e-10);
        assert!((l.max_position_size(10_000.0, 100.0, Some(0.04)) - 5.0).abs() < 1e-10);
        assert!((l.max_position_size(10_000.0, 100.0, Some(0.07)) - 2.0).abs() < 1e-10);

        l.observe(9_400.0, day(1), &breaker);
        assert!((l.max_position_size(9_400.0, 100.0, None) - 9_400.0 * 0.1 * 0.75 / 100.0).abs() < 1e-10);
        assert_eq!(l.max_position_size(9_400.0, 0.0, None), 0.0);
    }

    #[test]
    fn budget_resets_on_new_date() {
        let breaker = CircuitBreaker::new();
        let mut l = limits();
        l.observe(10_000.0, day(1), &breaker);
        assert!((l.remaining_budget() - 200.0).abs() < 1e-10);
        l.consume(150.0);
        l.consume(-20.0);
        assert!((l.remaining_budget() - 50.0).abs() < 1e-10);
        l.consume(100.0);
        assert_eq!(l.remaining_budget(), 0.0);
        assert!(l.budget().unwrap().is_exhausted());

        l.observe(10_000.0, day(2), &breaker);
        let budget = l.budget().unwrap();
        assert_eq!(budget.date, day(2));
        assert_eq!(budget.used, 0.0);
    }

    #[test]
    fn check_rejects_when_budget_exhausted() {
        let breaker = CircuitBreaker::new();
        let mut l = limits();
        l.observe(10_000.0, day(1), &breaker);
        l.consume(200.0);
        let ctx = RiskContext::new(10_000.0, 100.0, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        let outcome = l.check(&order(1.0), &ctx);
        assert_eq!(outcome.verdict, Verdict::Rejected);
        assert!(outcome.message.contains("budget"));
    }

    #[test]
    fn check_warns_in_reduced_band_and_rejects_oversize() {
        let breaker = CircuitBreaker::new();
        let mut l = limits();
        l.observe(10_000.0, day(1), &breaker);
        l.observe(9_400.0, day(1), &breaker);
        let ctx = RiskContext::new(9_400.0, 100.0, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(l.check(&order(1.0), &ctx).verdict, Verdict::Warning);
        assert_eq!(l.check(&order(8.0), &ctx).verdict, Verdict::Rejected);
    }
}
