//! Standard pre-trade policies.
//!
//! - MaxPositionSize: notional above a fraction of capital
//! - MaxLeverage: leverage above a ceiling
//! - MaxDailyDrawdown: capital loss since the day's first check
//! - MarginSufficiency: collateral required versus capital
//! - ExchangeMarginLevel: account margin level reported by the exchange
//! - FundingRateLimit: absolute perpetual funding rate

use chrono::NaiveDate;

use super::policy::{exceeds_limit, CheckOutcome, RiskContext, RiskPolicy};
use crate::domain::{OrderRequest, Position};

/// Reject when `amount * price > capital * max_fraction`.
#[derive(Debug, Clone)]
pub struct MaxPositionSize {
    pub max_fraction: f64,
}

impl MaxPositionSize {
    pub fn new(max_fraction: f64) -> Self {
        Self { max_fraction }
    }
}

impl RiskPolicy for MaxPositionSize {
    fn name(&self) -> &str {
        "max_position_size"
    }

    fn check(&mut self, order: &OrderRequest, context: &RiskContext) -> CheckOutcome {
        let notional = order.notional();
        let limit = context.capital * self.max_fraction;
        if exceeds_limit(notional, limit) {
            CheckOutcome::rejected(format!(
                "Position value {:.2} exceeds limit {:.2} ({:.1}% of capital)",
                notional,
                limit,
                self.max_fraction * 100.0
            ))
        } else {
            CheckOutcome::approved(format!("Position value {notional:.2} within limit {limit:.2}"))
        }
    }
}

/// Reject when the order's leverage is above `max_leverage`.
#[derive(Debug, Clone)]
pub struct MaxLeverage {
    pub max_leverage: f64,
}

impl MaxLeverage {
    pub fn new(max_leverage: f64) -> Self {
        Self { max_leverage }
    }
}

impl RiskPolicy for MaxLeverage {
    fn name(&self) -> &str {
        "max_leverage"
    }

    fn check(&mut self, order: &OrderRequest, _context: &RiskContext) -> CheckOutcome {
        if order.leverage > self.max_leverage {
            CheckOutcome::rejected(format!(
                "Leverage {:.1}x exceeds maximum {:.1}x",
                order.leverage, self.max_leverage
            ))
        } else {
            CheckOutcome::approved(format!("Leverage {:.1}x", order.leverage))
        }
    }
}

/// Reject once capital has fallen more than `max_drawdown` since the first
/// check of the calendar day; warn at 80% of that threshold.
#[derive(Debug, Clone)]
pub struct MaxDailyDrawdown {
    pub max_drawdown: f64,
    day: Option<NaiveDate>,
    day_start_capital: f64,
}

impl MaxDailyDrawdown {
    const WARN_FRACTION: f64 = 0.8;

    pub fn new(max_drawdown: f64) -> Self {
        Self {
            max_drawdown,
            day: None,
            day_start_capital: 0.0,
        }
    }

    pub fn day_start_capital(&self) -> f64 {
        self.day_start_capital
    }
}

impl RiskPolicy for MaxDailyDrawdown {
    fn name(&self) -> &str {
        "max_daily_drawdown"
    }

    fn check(&mut self, _order: &OrderRequest, context: &RiskContext) -> CheckOutcome {
        let today = context.date();
        if self.day != Some(today) {
            self.day = Some(today);
            self.day_start_capital = context.capital;
        }

        if self.day_start_capital <= 0.0 {
            return CheckOutcome::approved("Daily drawdown N/A (no starting capital)");
        }

        let drawdown = (self.day_start_capital - context.capital) / self.day_start_capital;
        if drawdown > self.max_drawdown {
            CheckOutcome::rejected(format!(
                "Daily drawdown {:.2}% exceeds limit {:.2}%",
                drawdown * 100.0,
                self.max_drawdown * 100.0
            ))
        } else if drawdown > self.max_drawdown * Self::WARN_FRACTION {
            CheckOutcome::warning(format!(
                "Daily drawdown {:.2}% approaching limit {:.2}%",
                drawdown * 100.0,
                self.max_drawdown * 100.0
            ))
        } else {
            CheckOutcome::approved(format!("Daily drawdown {:.2}%", drawdown.max(0.0) * 100.0))
        }
    }
}

/// Reject when the collateral an order locks exceeds `reject_ratio` of
/// capital; warn above `warn_ratio`.
#[derive(Debug, Clone)]
pub struct MarginSufficiency {
    pub reject_ratio: f64,
    pub warn_ratio: f64,
}

impl MarginSufficiency {
    pub fn new(reject_ratio: f64, warn_ratio: f64) -> Self {
        Self {
            reject_ratio,
            warn_ratio,
        }
    }
}

impl Default for MarginSufficiency {
    fn default() -> Self {
        Self::new(0.95, 0.70)
    }
}

impl RiskPolicy for MarginSufficiency {
    fn name(&self) -> &str {
        "margin_sufficiency"
    }

    fn check(&mut self, order: &OrderRequest, context: &RiskContext) -> CheckOutcome {
        let margin = order.margin_required();
        if context.capital <= 0.0 {
            return CheckOutcome::rejected(format!(
                "Margin {margin:.2} required but no capital available"
            ));
        }
        let usage = margin / context.capital;
        if exceeds_limit(usage, self.reject_ratio) {
            CheckOutcome::rejected(format!(
                "Margin {:.2} exceeds {:.0}% of capital {:.2}",
                margin,
                self.reject_ratio * 100.0,
                context.capital
            ))
        } else if exceeds_limit(usage, self.warn_ratio) {
            CheckOutcome::warning(format!(
                "Margin usage {:.1}% above {:.0}% of capital",
                usage * 100.0,
                self.warn_ratio * 100.0
            ))
        } else {
            CheckOutcome::approved(format!("Margin usage {:.1}%", usage * 100.0))
        }
    }
}

/// Exchange-reported margin level. Reject below `critical_level`, warn
/// below `min_level`.
#[derive(Debug, Clone)]
pub struct ExchangeMarginLevel {
    pub min_level: f64,
    pub critical_level: f64,
}

impl ExchangeMarginLevel {
    pub fn new(min_level: f64, critical_level: f64) -> Self {
        Self {
            min_level,
            critical_level,
        }
    }
}

impl RiskPolicy for ExchangeMarginLevel {
    fn name(&self) -> &str {
        "exchange_margin_level"
    }

    fn check(&mut self, _order: &OrderRequest, context: &RiskContext) -> CheckOutcome {
        let Some(balance) = context.balance else {
            return CheckOutcome::warning("No exchange balance data supplied");
        };
        let Some(level) = balance.margin_level else {
            return CheckOutcome::approved("Margin level N/A (spot account)");
        };
        if level < self.critical_level {
            CheckOutcome::rejected(format!(
                "Margin level {:.2} below critical {:.2}",
                level, self.critical_level
            ))
        } else if level < self.min_level {
            CheckOutcome::warning(format!(
                "Margin level {:.2} below minimum {:.2}",
                level, self.min_level
            ))
        } else {
            CheckOutcome::approved(format!("Margin level {level:.2}"))
        }
    }
}

/// Reject when `|funding_rate| > max_funding_rate`; warn when no funding
/// data is supplied.
#[derive(Debug, Clone)]
pub struct FundingRateLimit {
    pub max_funding_rate: f64,
}

impl FundingRateLimit {
    pub fn new(max_funding_rate: f64) -> Self {
        Self { max_funding_rate }
    }
}

impl RiskPolicy for FundingRateLimit {
    fn name(&self) -> &str {
        "funding_rate_limit"
    }

    fn check(&mut self, _order: &OrderRequest, context: &RiskContext) -> CheckOutcome {
        let Some(rate) = context.funding.and_then(|f| f.rate) else {
            return CheckOutcome::warning("No funding rate data supplied");
        };
        if rate.abs() > self.max_funding_rate {
            CheckOutcome::rejected(format!(
                "Funding rate {:.4}% exceeds limit {:.4}%",
                rate * 100.0,
                self.max_funding_rate * 100.0
            ))
        } else {
            CheckOutcome::approved(format!("Funding rate {:.4}%", rate * 100.0))
        }
    }
}

/// Position-level stop: signals a mandatory close once the price has moved
/// `stop_loss_pct` against the entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopLossRule {
    pub stop_loss_pct: f64,
}

impl StopLossRule {
    pub fn new(stop_loss_pct: f64) -> Self {
        Self { stop_loss_pct }
    }

    pub fn check(&self, position: &Position, current_price: f64) -> CheckOutcome {
        if position.entry_price <= 0.0 {
            return CheckOutcome::approved("Stop-loss N/A (no entry price)");
        }
        let pnl_pct =
            (current_price - position.entry_price) / position.entry_price * position.side.sign();
        if pnl_pct <= -self.stop_loss_pct {
            CheckOutcome::rejected(format!(
                "Stop-loss triggered: P&L {:.2}% <= -{:.2}%",
                pnl_pct * 100.0,
                self.stop_loss_pct * 100.0
            ))
        } else {
            CheckOutcome::approved(format!("P&L {:.2}%", pnl_pct * 100.0))
        }
    }
}
