//! # Bounded retry budget for one step of the connection protocol.

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Attempt budget plus spacing between attempts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts allowed (minimum 1).
    pub attempts: u32,
    /// Delay after the n-th failure (`n` starting at 0).
    pub backoff: BackoffPolicy,
}

impl RetryPolicy {
    /// `attempts` tries spaced by a constant `delay`.
    pub const fn fixed(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            backoff: BackoffPolicy::constant(delay),
        }
    }

    /// True when `failures` failed attempts have used up the budget.
    #[inline]
    pub fn exhausted(&self, failures: u32) -> bool {
        failures >= self.attempts.max(1)
    }

    /// Sleep before the next attempt after `failures` failures (`failures >= 1`).
    #[inline]
    pub fn delay(&self, failures: u32) -> Duration {
        self.backoff.next(failures.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_counts_total_attempts() {
        let retry = RetryPolicy::fixed(5, Duration::from_millis(500));
        assert!(!retry.exhausted(4));
        assert!(retry.exhausted(5));
        assert_eq!(retry.delay(1), Duration::from_millis(500));
        assert_eq!(retry.delay(4), Duration::from_millis(500));
    }

    #[test]
    fn zero_attempts_still_allows_one() {
        let retry = RetryPolicy::fixed(0, Duration::ZERO);
        assert!(!retry.exhausted(0));
        assert!(retry.exhausted(1));
    }
}
