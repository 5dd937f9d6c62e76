use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::order::OrderSide;

/// An entry the risk chain refused. Kept for audit; never retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedOrder {
    pub timestamp: DateTime<Utc>,
    pub bar_index: usize,
    pub side: OrderSide,
    pub price: f64,
    /// Every non-approved policy message, joined with `"; "`.
    pub reasons: String,
}
