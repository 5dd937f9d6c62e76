//! Cost model: slippage and fees.
//!
//! Slippage is directional: buyers pay more, sellers receive less.
//! Entries and signal exits cross the spread and pay the taker rate; resting
//! stop-loss and take-profit exits pay the maker rate and fill at their level.

use crate::domain::OrderSide;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub maker_fee: f64,
    pub taker_fee: f64,
    pub slippage_rate: f64,
}

impl CostModel {
    pub fn new(maker_fee: f64, taker_fee: f64, slippage_rate: f64) -> Self {
        Self {
            maker_fee,
            taker_fee,
            slippage_rate,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Price after adverse slippage for an order on `side`.
    pub fn apply_slippage(&self, raw_price: f64, side: OrderSide) -> f64 {
        match side {
            OrderSide::Buy => raw_price * (1.0 + self.slippage_rate),
            OrderSide::Sell => raw_price * (1.0 - self.slippage_rate),
        }
    }

    pub fn fee(&self, notional: f64, resting: bool) -> f64 {
        let rate = if resting {
            self.maker_fee
        } else {
            self.taker_fee
        };
        notional.abs() * rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frictionless_returns_raw_price() {
        let cost = CostModel::frictionless();
        assert_eq!(cost.apply_slippage(100.0, OrderSide::Buy), 100.0);
        assert_eq!(cost.fee(10_000.0, false), 0.0);
    }

    #[test]
    fn slippage_is_adverse() {
        let cost = CostModel::new(0.0, 0.0, 0.001);
        assert!((cost.apply_slippage(100.0, OrderSide::Buy) - 100.1).abs() < 1e-10);
        assert!((cost.apply_slippage(100.0, OrderSide::Sell) - 99.9).abs() < 1e-10);
    }

    #[test]
    fn maker_and_taker_rates() {
        let cost = CostModel::new(0.0002, 0.0004, 0.0);
        assert!((cost.fee(10_000.0, true) - 2.0).abs() < 1e-10);
        assert!((cost.fee(10_000.0, false) - 4.0).abs() < 1e-10);
    }
}
