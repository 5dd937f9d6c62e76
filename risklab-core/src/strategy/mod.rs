//! Strategy: the external decision function the simulator consults each bar.
//!
//! A strategy sees the candle history up to and including the current bar
//! and nothing else: no capital, no position. It may keep internal state
//! across calls but must never look past the last candle it is given.

mod ma_crossover;
mod scripted;

pub use ma_crossover::MaCrossover;
pub use scripted::ScriptedStrategy;

use thiserror::Error;

use crate::domain::{Candle, Signal};

/// A strategy failure. Fatal to the run that observed it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("strategy '{name}' failed at bar {bar}: {message}")]
    Failed {
        name: String,
        bar: usize,
        message: String,
    },
    #[error("invalid strategy parameters: {0}")]
    InvalidParameters(String),
}

pub trait Strategy: Send {
    /// Human-readable name (e.g., "ma_crossover_10_30").
    fn name(&self) -> &str;

    /// Decide on the last candle of `history`.
    ///
    /// `Ok(None)` means HOLD. Invalid signals are also treated as HOLD by the
    /// caller.
    fn on_bar(&mut self, history: &[Candle]) -> Result<Option<Signal>, StrategyError>;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn on_bar(&mut self, history: &[Candle]) -> Result<Option<Signal>, StrategyError> {
        (**self).on_bar(history)
    }
}
