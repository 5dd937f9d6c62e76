//! Circuit breaker: global kill-switch for new trading activity.
//!
//! Once tripped, every order is rejected until an operator calls `reset`.
//! The breaker is shared by handle (`Arc<CircuitBreaker>`) between every
//! risk chain that should observe it; writes go through a mutex.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

/// State of the circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BreakerState {
    /// Normal operation: orders are evaluated.
    #[default]
    Closed,
    /// Tripped: all orders are refused until reset.
    Open { reason: String },
}

#[derive(Debug, Default)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh breaker behind a shareable handle.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Trip the breaker. A breaker that is already open keeps its original reason.
    pub fn trigger(&self, reason: impl Into<String>) {
        let mut state = self.lock();
        if let BreakerState::Closed = *state {
            let reason = reason.into();
            warn!(%reason, "circuit breaker triggered");
            *state = BreakerState::Open { reason };
        }
    }

    /// Operator reset.
    pub fn reset(&self) {
        let mut state = self.lock();
        if let BreakerState::Open { reason } = &*state {
            info!(%reason, "circuit breaker reset");
        }
        *state = BreakerState::Closed;
    }

    pub fn is_triggered(&self) -> bool {
        matches!(*self.lock(), BreakerState::Open { .. })
    }

    pub fn reason(&self) -> Option<String> {
        match &*self.lock() {
            BreakerState::Closed => None,
            BreakerState::Open { reason } => Some(reason.clone()),
        }
    }

    pub fn state(&self) -> BreakerState {
        self.lock().clone()
    }
}
