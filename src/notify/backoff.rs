//! Exponential reconnection backoff.

use std::time::Duration;

/// Reconnection backoff: the delay doubles on each failure up to a cap,
/// and the attempt count is bounded. Reset on every successful connect.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max,
            max_attempts,
            attempts: 0,
        }
    }

    /// Record a failure and return the delay before the next attempt, or
    /// `None` once the attempt budget is exhausted (the caller should
    /// permanently disable itself).
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        let delay = self
            .base
            .checked_mul(1u32 << self.attempts.min(16))
            .map(|d| d.min(self.max))
            .unwrap_or(self.max);
        self.attempts += 1;
        Some(delay)
    }

    /// Reset after a successful connect.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Failures recorded since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// True once the attempt budget is exhausted.
    pub fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30), 5)
    }
}
