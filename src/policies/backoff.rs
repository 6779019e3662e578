//! # Backoff policy for restarts and resolver retries.
//!
//! [`BackoffPolicy`] turns a failure count into a sleep duration:
//! `first × factor^n`, clamped to `max`, then jittered. The base depends only on `n`,
//! so jitter never feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use carousel::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//!
//! // The resolver's fixed spacing is a constant policy.
//! assert_eq!(BackoffPolicy::constant(Duration::from_millis(500)).next(7), Duration::from_millis(500));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay for `n = 0`.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`1.0` = constant).
    pub factor: f64,
    /// Jitter policy.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Immediate retry: `first = max = 0`.
    fn default() -> Self {
        Self::immediate()
    }
}

impl BackoffPolicy {
    /// No delay at all.
    pub const fn immediate() -> Self {
        Self::constant(Duration::ZERO)
    }

    /// The same `delay` for every attempt, no jitter.
    pub const fn constant(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the delay after `n` previous failures.
    ///
    /// Non-finite or out-of-range intermediate values clamp to `max`.
    pub fn next(&self, n: u32) -> Duration {
        let exp = n.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }
}
