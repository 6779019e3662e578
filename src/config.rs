//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the orchestrator and
//! [`ResolverConfig`] for the endpoint connection protocol.
//!
//! Config is used in two ways:
//! 1. **Orchestrator creation**: `Orchestrator::new(config, subscribers)`
//! 2. **ServiceSpec defaults**: `ServiceSpec::with_defaults(service, port, &config)`
//!
//! All thresholds are tunable policy; the defaults are the values the show has
//! always run with.

use std::time::Duration;

use crate::policies::{RestartPolicy, RetryPolicy};

/// Label the synthesizer registers its input endpoint under.
pub const DEFAULT_LABEL: &str = ": 'TiMidity'";

/// Well-known port the show's events are published on.
pub const DEFAULT_PORT: &str = "14:0";

/// Retry budgets for the three stages of the connection protocol.
///
/// A bind failure or a missing endpoint restarts the protocol from the listing
/// stage; each stage keeps its own failure counter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolverConfig {
    /// Listing the registry (`aconnect -l`) failed.
    pub query: RetryPolicy,
    /// The listing did not contain the label yet.
    pub lookup: RetryPolicy,
    /// Binding the two endpoints failed.
    pub bind: RetryPolicy,
}

impl Default for ResolverConfig {
    /// 5 attempts per stage; 500ms between query/bind retries, 1s between lookups.
    fn default() -> Self {
        Self {
            query: RetryPolicy::fixed(5, Duration::from_millis(500)),
            lookup: RetryPolicy::fixed(5, Duration::from_secs(1)),
            bind: RetryPolicy::fixed(5, Duration::from_millis(500)),
        }
    }
}

/// Global configuration for the orchestrator runtime.
///
/// ## Field semantics
/// - `grace`: Maximum wait for every task to unwind after cancellation
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `restart`: Default restart policy (can be overridden per service)
/// - `resolver`: Connection protocol budgets
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for graceful shutdown before aborting tasks.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Default restart policy for services.
    pub restart: RestartPolicy,

    /// Endpoint resolver retry budgets.
    pub resolver: ResolverConfig,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `grace = 30s`
    /// - `bus_capacity = 1024`
    /// - `restart = RestartPolicy::default()` (5 restarts, 10s threshold)
    /// - `resolver = ResolverConfig::default()`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            bus_capacity: 1024,
            restart: RestartPolicy::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_show_timings() {
        let cfg = Config::default();
        assert_eq!(cfg.restart.max_restarts, 5);
        assert_eq!(cfg.restart.fast_failure, Duration::from_secs(10));
        assert_eq!(cfg.resolver.query.attempts, 5);
        assert_eq!(cfg.resolver.lookup.delay(1), Duration::from_secs(1));
        assert_eq!(cfg.resolver.bind.delay(3), Duration::from_millis(500));
    }

    #[test]
    fn bus_capacity_is_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
