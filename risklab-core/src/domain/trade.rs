//! ClosedTrade: a completed round trip, immutable once recorded.

use super::position::PositionSide;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    Signal,
    #[serde(rename = "SL")]
    StopLoss,
    #[serde(rename = "TP")]
    TakeProfit,
    End,
}

impl ExitReason {
    /// Stop-loss and take-profit exits rest on the book and pay the maker rate.
    pub fn is_resting(&self) -> bool {
        matches!(self, ExitReason::StopLoss | ExitReason::TakeProfit)
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::Signal => write!(f, "Signal"),
            ExitReason::StopLoss => write!(f, "SL"),
            ExitReason::TakeProfit => write!(f, "TP"),
            ExitReason::End => write!(f, "End"),
        }
    }
}

/// A complete round-trip trade record: entry → exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub side: PositionSide,

    // ── Entry ──
    pub entry_bar: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,

    // ── Size ──
    pub size: f64,
    pub leverage: f64,

    // ── PnL ──
    /// Price P&L before fees.
    pub gross_pnl: f64,
    /// Realized P&L net of entry and exit fees.
    pub pnl: f64,
    /// Net P&L as a percentage of the margin committed.
    pub pnl_pct: f64,
    pub fees: f64,

    pub exit_reason: ExitReason,
}

impl ClosedTrade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }

    pub fn duration_hours(&self) -> f64 {
        (self.exit_time - self.entry_time).num_seconds() as f64 / 3600.0
    }
}
