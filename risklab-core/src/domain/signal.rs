//! Signal: the decision a strategy emits for one candle.

use serde::{Deserialize, Serialize};

/// What the strategy wants to do on this bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    Buy,
    Sell,
    Hold,
    Close,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::Buy => write!(f, "BUY"),
            SignalKind::Sell => write!(f, "SELL"),
            SignalKind::Hold => write!(f, "HOLD"),
            SignalKind::Close => write!(f, "CLOSE"),
        }
    }
}

/// A strategy decision with its conviction and free-text rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    /// Conviction in `[0, 1]`.
    pub confidence: f64,
    pub rationale: String,
}

impl Signal {
    pub fn new(kind: SignalKind, confidence: f64, rationale: impl Into<String>) -> Self {
        Self {
            kind,
            confidence,
            rationale: rationale.into(),
        }
    }

    pub fn hold() -> Self {
        Self::new(SignalKind::Hold, 0.0, "")
    }

    pub fn buy(confidence: f64) -> Self {
        Self::new(SignalKind::Buy, confidence, "")
    }

    pub fn sell(confidence: f64) -> Self {
        Self::new(SignalKind::Sell, confidence, "")
    }

    pub fn close(confidence: f64) -> Self {
        Self::new(SignalKind::Close, confidence, "")
    }

    /// A signal is well-formed when its confidence is a finite value in `[0, 1]`.
    pub fn is_valid(&self) -> bool {
        self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence)
    }

    /// Collapse missing or malformed strategy output to HOLD.
    pub fn sanitize(raw: Option<Signal>) -> Signal {
        match raw {
            Some(signal) if signal.is_valid() => signal,
            _ => Signal::hold(),
        }
    }
}
