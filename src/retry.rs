//! Bounded retry with capped exponential backoff.
//!
//! Replaces blind restart-forever recovery: the top-level driver re-runs the
//! whole supervisor after a fatal failure, but only `max_attempts` times and
//! with a growing delay, so a deterministic startup failure (say, a missing
//! program) cannot spin at full speed indefinitely.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total runs allowed, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles per failure.
    pub initial_backoff: Duration,
    /// Upper bound on the delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl From<&crate::config::RetryConfig> for RetryPolicy {
    fn from(config: &crate::config::RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

/// Attempt counter for one driver lifetime.
#[derive(Debug)]
pub struct RetryState {
    policy: RetryPolicy,
    attempts: u32,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Record a failed attempt. Returns the delay to sleep before the next
    /// attempt, or `None` when the attempt budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.attempts += 1;
        if self.attempts >= self.policy.max_attempts {
            return None;
        }
        // Shift bounded to keep the multiplier in range; the cap below
        // dominates long before that matters.
        let exp = (self.attempts - 1).min(16);
        let backoff = self.policy.initial_backoff.saturating_mul(1 << exp);
        Some(backoff.min(self.policy.max_backoff))
    }

    /// Failed attempts recorded so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
