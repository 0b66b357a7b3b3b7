//! Bounded exponential backoff.
//!
//! Invariant: `base <= current <= max`. Every failure doubles the
//! delay (capped at `max`); every success resets it to `base`.

use std::time::Duration;

/// Retry delay state for one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffState {
    current: Duration,
    base: Duration,
    max: Duration,
}

impl BackoffState {
    /// Create a backoff starting at `base`. If `max < base`, `max` is
    /// raised to `base` so the invariant holds.
    pub fn new(base: Duration, max: Duration) -> Self {
        let max = max.max(base);
        Self {
            current: base,
            base,
            max,
        }
    }

    /// Delay to wait after the next failure.
    pub const fn current(&self) -> Duration {
        self.current
    }

    /// Configured base delay.
    pub const fn base(&self) -> Duration {
        self.base
    }

    /// Configured ceiling.
    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Record a failure: return the delay to wait now and double the
    /// delay for the following failure.
    pub fn on_failure(&mut self) -> Duration {
        let delay = self.current.min(self.max);
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Record a success: reset to the base delay.
    pub fn on_success(&mut self) {
        self.current = self.base;
    }
}
