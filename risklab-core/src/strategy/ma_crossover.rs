//! Moving-average crossover.
//!
//! BUY when the fast SMA of closes crosses above the slow SMA. On the
//! opposite cross: SELL when shorting is allowed, CLOSE otherwise.

use super::{Strategy, StrategyError};
use crate::domain::{Candle, Signal, SignalKind};

#[derive(Debug, Clone)]
pub struct MaCrossover {
    fast: usize,
    slow: usize,
    allow_short: bool,
    name: String,
}

impl MaCrossover {
    pub fn new(fast: usize, slow: usize, allow_short: bool) -> Result<Self, StrategyError> {
        if fast == 0 || fast >= slow {
            return Err(StrategyError::InvalidParameters(format!(
                "need 0 < fast < slow, got fast={fast} slow={slow}"
            )));
        }
        Ok(Self {
            fast,
            slow,
            allow_short,
            name: format!("ma_crossover_{fast}_{slow}"),
        })
    }

    /// Bars needed before the first crossover can be detected.
    pub fn warmup_bars(&self) -> usize {
        self.slow + 1
    }
}

/// Mean close of the `period` candles ending at `end` (exclusive).
fn sma(history: &[Candle], end: usize, period: usize) -> f64 {
    let window = &history[end - period..end];
    window.iter().map(|c| c.close).sum::<f64>() / period as f64
}

impl Strategy for MaCrossover {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_bar(&mut self, history: &[Candle]) -> Result<Option<Signal>, StrategyError> {
        let n = history.len();
        if n < self.warmup_bars() {
            return Ok(None);
        }

        let fast_now = sma(history, n, self.fast);
        let slow_now = sma(history, n, self.slow);
        let fast_prev = sma(history, n - 1, self.fast);
        let slow_prev = sma(history, n - 1, self.slow);

        if !(fast_now.is_finite() && slow_now.is_finite() && slow_now > 0.0) {
            return Ok(None);
        }
        let spread = ((fast_now - slow_now) / slow_now).abs();
        let confidence = (0.5 + spread * 10.0).min(1.0);

        let crossed_up = fast_prev <= slow_prev && fast_now > slow_now;
        let crossed_down = fast_prev >= slow_prev && fast_now < slow_now;

        let signal = if crossed_up {
            Some(Signal::new(SignalKind::Buy, confidence, "fast SMA crossed above slow"))
        } else if crossed_down {
            let kind = if self.allow_short {
                SignalKind::Sell
            } else {
                SignalKind::Close
            };
            Some(Signal::new(kind, confidence, "fast SMA crossed below slow"))
        } else {
            None
        };
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn series(closes: &[f64]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::flat(start + Duration::hours(i as i64), c))
            .collect()
    }

    fn signals(strategy: &mut MaCrossover, bars: &[Candle]) -> Vec<(usize, SignalKind)> {
        (1..=bars.len())
            .filter_map(|n| {
                strategy
                    .on_bar(&bars[..n])
                    .unwrap()
                    .map(|s| (n - 1, s.kind))
            })
            .collect()
    }

    #[test]
    fn rejects_bad_periods() {
        assert!(MaCrossover::new(0, 5, false).is_err());
        assert!(MaCrossover::new(5, 5, false).is_err());
        assert!(MaCrossover::new(3, 5, false).is_ok());
    }

    #[test]
    fn detects_up_then_down_cross() {
        let mut closes = vec![100.0; 10];
        closes.extend([101.0, 103.0, 106.0, 110.0]);
        closes.extend([104.0, 98.0, 92.0, 88.0]);
        let bars = series(&closes);

        let mut long_only = MaCrossover::new(2, 5, false).unwrap();
        let fired = signals(&mut long_only, &bars);
        assert_eq!(fired.first().map(|s| s.1), Some(SignalKind::Buy));
        assert_eq!(fired.last().map(|s| s.1), Some(SignalKind::Close));

        let mut with_short = MaCrossover::new(2, 5, true).unwrap();
        let fired = signals(&mut with_short, &bars);
        assert_eq!(fired.last().map(|s| s.1), Some(SignalKind::Sell));
    }

    #[test]
    fn flat_series_never_signals() {
        let bars = series(&[100.0; 40]);
        let mut s = MaCrossover::new(3, 10, true).unwrap();
        assert!(signals(&mut s, &bars).is_empty());
    }

    #[test]
    fn confidence_stays_in_range() {
        let mut closes = vec![100.0; 10];
        closes.extend([200.0, 400.0]);
        let bars = series(&closes);
        let mut s = MaCrossover::new(2, 5, false).unwrap();
        for n in 1..=bars.len() {
            if let Some(sig) = s.on_bar(&bars[..n]).unwrap() {
                assert!(sig.is_valid());
            }
        }
    }
}
