//! The shared capability every risk policy implements, and the context it
//! is evaluated against.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::OrderRequest;

/// Outcome of a single policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Approved,
    Warning,
    Rejected,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Approved => write!(f, "APPROVED"),
            Verdict::Warning => write!(f, "WARNING"),
            Verdict::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Verdict plus the human-readable explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub verdict: Verdict,
    pub message: String,
}

impl CheckOutcome {
    pub fn approved(message: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Approved,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Warning,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Rejected,
            message: message.into(),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.verdict == Verdict::Rejected
    }
}

/// Exchange account snapshot. `margin_level` is `None` for spot-only accounts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub margin_level: Option<f64>,
}

/// Perpetual funding snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FundingSnapshot {
    pub rate: Option<f64>,
}

/// Trading context an order is validated against.
///
/// A missing snapshot is distinct from a snapshot holding zero: policies that
/// depend on external data warn when it is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskContext {
    pub capital: f64,
    pub current_price: f64,
    pub timestamp: DateTime<Utc>,
    /// Recent return volatility (std of close-to-close returns).
    pub volatility: Option<f64>,
    /// Stop distance of the proposed entry, used to size risk-budget usage.
    pub stop_loss_pct: Option<f64>,
    pub balance: Option<BalanceSnapshot>,
    pub funding: Option<FundingSnapshot>,
}

impl RiskContext {
    pub fn new(capital: f64, current_price: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            capital,
            current_price,
            timestamp,
            volatility: None,
            stop_loss_pct: None,
            balance: None,
            funding: None,
        }
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = Some(volatility);
        self
    }

    pub fn with_stop_loss_pct(mut self, pct: f64) -> Self {
        self.stop_loss_pct = Some(pct);
        self
    }

    pub fn with_balance(mut self, balance: BalanceSnapshot) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn with_funding(mut self, funding: FundingSnapshot) -> Self {
        self.funding = Some(funding);
        self
    }

    /// Calendar date used for per-day state.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Relative slack applied to size ceilings. Order amounts are derived as
/// `notional / price`, and recomputing `amount * price` can land one ulp
/// above a ceiling the order was sized to meet exactly.
pub const LIMIT_TOLERANCE: f64 = 1e-9;

/// `value > limit`, ignoring float noise within `LIMIT_TOLERANCE` of `limit`.
pub fn exceeds_limit(value: f64, limit: f64) -> bool {
    value > limit + limit.abs() * LIMIT_TOLERANCE
}

/// A composable pre-trade check.
///
/// Policies may keep per-day state, hence `&mut self`. They must never
/// panic on degenerate input; a zero capital or price is a verdict, not an
/// error.
pub trait RiskPolicy: Send + Sync {
    /// Policy name for logs and audit records.
    fn name(&self) -> &str;

    fn check(&mut self, order: &OrderRequest, context: &RiskContext) -> CheckOutcome;
}
