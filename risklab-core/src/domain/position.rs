use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Long or short exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

/// The single open position of a simulation run.
///
/// `size` is denominated in margin units (collateral / entry price); the
/// exposure is `size * leverage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub entry_bar: usize,
    pub size: f64,
    pub leverage: f64,
    pub margin: f64,
    pub entry_fee: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl Position {
    /// Gross P&L at `price`: `(price - entry) * size * leverage`, sign-flipped for shorts.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.size * self.leverage * self.side.sign()
    }

    /// Unrealized P&L as a fraction of the margin held.
    pub fn unrealized_pnl_pct(&self, price: f64) -> f64 {
        if self.margin <= 0.0 {
            return 0.0;
        }
        self.unrealized_pnl(price) / self.margin
    }

    pub fn notional(&self, price: f64) -> f64 {
        self.size * self.leverage * price
    }

    pub fn bars_held(&self, bar_index: usize) -> usize {
        bar_index.saturating_sub(self.entry_bar)
    }

    pub fn stop_loss_hit(&self, price: f64) -> bool {
        match self.side {
            PositionSide::Long => price <= self.stop_loss,
            PositionSide::Short => price >= self.stop_loss,
        }
    }

    pub fn take_profit_hit(&self, price: f64) -> bool {
        match self.side {
            PositionSide::Long => price >= self.take_profit,
            PositionSide::Short => price <= self.take_profit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn position(side: PositionSide) -> Position {
        Position {
            side,
            entry_price: 100.0,
            entry_time: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            entry_bar: 10,
            size: 10.0,
            leverage: 2.0,
            margin: 1_000.0,
            entry_fee: 0.0,
            stop_loss: if side == PositionSide::Long { 98.0 } else { 102.0 },
            take_profit: if side == PositionSide::Long { 104.0 } else { 96.0 },
        }
    }

    #[test]
    fn long_pnl_includes_leverage() {
        let p = position(PositionSide::Long);
        assert!((p.unrealized_pnl(101.0) - 20.0).abs() < 1e-10);
        assert!((p.unrealized_pnl_pct(101.0) - 0.02).abs() < 1e-10);
    }

    #[test]
    fn short_pnl_inverted() {
        let p = position(PositionSide::Short);
        assert!((p.unrealized_pnl(101.0) + 20.0).abs() < 1e-10);
    }

    #[test]
    fn stop_and_target_directional() {
        let long = position(PositionSide::Long);
        assert!(long.stop_loss_hit(97.0));
        assert!(!long.stop_loss_hit(99.0));
        assert!(long.take_profit_hit(104.5));

        let short = position(PositionSide::Short);
        assert!(short.stop_loss_hit(103.0));
        assert!(short.take_profit_hit(95.0));
        assert!(!short.take_profit_hit(97.0));
    }

    #[test]
    fn bars_held_saturates() {
        let p = position(PositionSide::Long);
        assert_eq!(p.bars_held(15), 5);
        assert_eq!(p.bars_held(3), 0);
    }
}
