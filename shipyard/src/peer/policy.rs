//! Retry policy for peer handoffs.

use std::time::Duration;

use crate::config::SimulationConfig;

/// Fixed-delay retry policy.
///
/// Every attempt, the first included, is preceded by `delay`. After
/// `max_attempts` failures the handoff is abandoned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    pub max_attempts: u32,
    /// Wait before each attempt.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Creates a fixed retry policy.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// The delivery policy described by the simulation config.
    pub fn delivery(config: &SimulationConfig) -> Self {
        Self::fixed(config.max_delivery_attempts, config.delivery_retry_wait)
    }

    /// Delay before the given attempt (1-based), or `None` once attempts are exhausted.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        (attempt >= 1 && attempt <= self.max_attempts).then_some(self.delay)
    }
}
