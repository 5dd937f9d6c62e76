//! Order requests submitted to the risk chain before an entry is filled.

use serde::{Deserialize, Serialize};

/// Direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// A proposed entry, as seen by the risk policies.
///
/// `amount` is the exposure in base units (leverage included), so
/// `amount * price` is the order's notional value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub amount: f64,
    pub price: f64,
    pub leverage: f64,
}

impl OrderRequest {
    pub fn notional(&self) -> f64 {
        self.amount * self.price
    }

    /// Collateral the order would lock: `notional / leverage`.
    pub fn margin_required(&self) -> f64 {
        if self.leverage <= 0.0 {
            return self.notional();
        }
        self.notional() / self.leverage
    }
}
