//! # Crash-loop restart policy.
//!
//! [`RestartPolicy`] decides what the restart supervisor does after a service run
//! ends without cancellation being requested.
//!
//! - A run that lasted at least [`RestartPolicy::fast_failure`] is a *slow* failure:
//!   the consecutive-failure counter resets and the service is restarted.
//! - A shorter run is a *fast* failure: it counts toward the crash-loop ceiling.
//! - A fast failure observed when the counter already equals
//!   [`RestartPolicy::max_restarts`] is terminal.
//!
//! ```text
//! failures=0 ─fast─► Retry{1} ─fast─► ... ─fast─► Retry{max} ─fast─► Exhausted
//!      ▲                 │                             │
//!      └──────slow───────┴─────────────slow────────────┘   (Fresh)
//! ```
//!
//! With `max_restarts = 5` a service that always fails fast runs six times:
//! the initial run and five restarts.

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// What to do after a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Restart {
    /// Slow failure: restart with the counter reset to 0.
    Fresh,
    /// Fast failure under the ceiling: restart with the new counter value.
    Retry {
        /// Consecutive fast failures, including this one.
        failures: u32,
    },
    /// Fast failure at the ceiling: stop and report.
    Exhausted,
}

/// Restart ceiling and timing for one supervised service.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RestartPolicy {
    /// Consecutive fast failures tolerated before giving up.
    pub max_restarts: u32,
    /// Runs shorter than this count as crash-loop attempts.
    pub fast_failure: Duration,
    /// Delay before each restart, indexed by the consecutive-failure counter.
    pub backoff: BackoffPolicy,
}

impl Default for RestartPolicy {
    /// `max_restarts = 5`, `fast_failure = 10s`, immediate restart.
    fn default() -> Self {
        Self {
            max_restarts: 5,
            fast_failure: Duration::from_secs(10),
            backoff: BackoffPolicy::immediate(),
        }
    }
}

impl RestartPolicy {
    /// Classifies a finished run given the counter before it and how long it ran.
    pub fn next(&self, failures: u32, ran_for: Duration) -> Restart {
        if ran_for >= self.fast_failure {
            Restart::Fresh
        } else if failures >= self.max_restarts {
            Restart::Exhausted
        } else {
            Restart::Retry {
                failures: failures + 1,
            }
        }
    }

    /// Returns a copy with a different ceiling.
    pub fn with_max_restarts(mut self, max_restarts: u32) -> Self {
        self.max_restarts = max_restarts;
        self
    }

    /// Returns a copy with a different fast-failure threshold.
    pub fn with_fast_failure(mut self, fast_failure: Duration) -> Self {
        self.fast_failure = fast_failure;
        self
    }

    /// Returns a copy with a different restart backoff.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}
