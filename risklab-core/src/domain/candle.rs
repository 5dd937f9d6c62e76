//! Candle: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV observation for one fixed interval.
///
/// Candles are produced by the data-loading layer and never mutated by the
/// simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Why a candle failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandleError {
    #[error("non-finite field in candle at {timestamp}")]
    NonFinite { timestamp: DateTime<Utc> },
    #[error("non-positive price in candle at {timestamp}")]
    NonPositivePrice { timestamp: DateTime<Utc> },
    #[error("inconsistent OHLC at {timestamp}: low={low} open={open} close={close} high={high}")]
    InconsistentRange {
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
    #[error("negative volume at {timestamp}")]
    NegativeVolume { timestamp: DateTime<Utc> },
    #[error("timestamp {current} does not follow {previous}")]
    NonMonotonic {
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
}

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Flat candle where every price equals `price`.
    pub fn flat(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self::new(timestamp, price, price, price, price, 0.0)
    }

    /// Check `low <= min(open, close) <= max(open, close) <= high` plus
    /// finiteness and positive prices.
    pub fn validate(&self) -> Result<(), CandleError> {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(CandleError::NonFinite {
                timestamp: self.timestamp,
            });
        }
        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(CandleError::NonPositivePrice {
                timestamp: self.timestamp,
            });
        }
        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        if self.low > body_low || body_high > self.high {
            return Err(CandleError::InconsistentRange {
                timestamp: self.timestamp,
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }
        if self.volume < 0.0 {
            return Err(CandleError::NegativeVolume {
                timestamp: self.timestamp,
            });
        }
        Ok(())
    }

    pub fn is_sane(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Validate every candle and require strictly increasing timestamps.
pub fn validate_series(candles: &[Candle]) -> Result<(), (usize, CandleError)> {
    for (i, candle) in candles.iter().enumerate() {
        candle.validate().map_err(|e| (i, e))?;
        if i > 0 && candle.timestamp <= candles[i - 1].timestamp {
            return Err((
                i,
                CandleError::NonMonotonic {
                    previous: candles[i - 1].timestamp,
                    current: candle.timestamp,
                },
            ));
        }
    }
    Ok(())
}
