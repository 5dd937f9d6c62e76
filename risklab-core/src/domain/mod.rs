//! Domain types for RiskLab

pub mod candle;
pub mod order;
pub mod position;
pub mod ratio;
pub mod rejection;
pub mod signal;
pub mod trade;

pub use candle::{validate_series, Candle, CandleError};
pub use order::{OrderRequest, OrderSide};
pub use position::{Position, PositionSide};
pub use rejection::RejectedOrder;
pub use signal::{Signal, SignalKind};
pub use trade::{ClosedTrade, ExitReason};
