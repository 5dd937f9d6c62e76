use std::collections::BTreeMap;

use super::{Strategy, StrategyError};
use crate::domain::{Candle, Signal, SignalKind};

/// Replays a fixed schedule of signals keyed by bar index; HOLD elsewhere.
#[derive(Debug, Clone, Default)]
pub struct ScriptedStrategy {
    script: BTreeMap<usize, Signal>,
    fail_at: Option<usize>,
}

impl ScriptedStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `kind` (confidence 1.0) at `bar`.
    pub fn at(mut self, bar: usize, kind: SignalKind) -> Self {
        self.script
            .insert(bar, Signal::new(kind, 1.0, format!("scripted {kind}")));
        self
    }

    /// Emit an arbitrary signal at `bar`, valid or not.
    pub fn with_signal(mut self, bar: usize, signal: Signal) -> Self {
        self.script.insert(bar, signal);
        self
    }

    /// Emit `kind` on every bar of `bars`.
    pub fn repeat(mut self, bars: std::ops::Range<usize>, kind: SignalKind) -> Self {
        for bar in bars {
            self = self.at(bar, kind);
        }
        self
    }

    /// Return an error once `bar` is reached.
    pub fn failing_at(mut self, bar: usize) -> Self {
        self.fail_at = Some(bar);
        self
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn on_bar(&mut self, history: &[Candle]) -> Result<Option<Signal>, StrategyError> {
        let Some(bar) = history.len().checked_sub(1) else {
            return Ok(None);
        };
        if self.fail_at == Some(bar) {
            return Err(StrategyError::Failed {
                name: self.name().to_string(),
                bar,
                message: "scripted failure".into(),
            });
        }
        Ok(self.script.get(&bar).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn history(n: usize) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| Candle::flat(start + Duration::hours(i as i64), 100.0))
            .collect()
    }

    #[test]
    fn emits_only_at_scripted_bars() {
        let mut s = ScriptedStrategy::new().at(2, SignalKind::Buy);
        let bars = history(4);
        assert_eq!(s.on_bar(&bars[..2]).unwrap(), None);
        assert_eq!(s.on_bar(&bars[..3]).unwrap().unwrap().kind, SignalKind::Buy);
        assert_eq!(s.on_bar(&bars[..4]).unwrap(), None);
    }

    #[test]
    fn empty_history_is_hold() {
        let mut s = ScriptedStrategy::new().at(0, SignalKind::Buy);
        assert_eq!(s.on_bar(&[]).unwrap(), None);
    }

    #[test]
    fn failing_bar_returns_error() {
        let mut s = ScriptedStrategy::new().failing_at(1);
        let bars = history(2);
        assert!(matches!(s.on_bar(&bars), Err(StrategyError::Failed { bar: 1, .. })));
    }
}
