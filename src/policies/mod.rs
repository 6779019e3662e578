//! Restart and retry policies.
//!
//! This module groups the knobs that control **if/when** a service is restarted
//! and **how long** to wait between attempts.
//!
//! ## Contents
//! - [`RestartPolicy`] crash-loop ceiling and fast-failure threshold for a service
//! - [`RetryPolicy`]   attempt budget for one step of the connection protocol
//! - [`BackoffPolicy`] how delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy
//!
//! ## Quick wiring
//! ```text
//! ServiceSpec { restart: RestartPolicy, .. }
//!      └─► core::actor::ServiceActor uses:
//!           - restart.next(failures, ran_for) to decide restart / give up
//!           - restart.backoff.next(failures) to delay the next run
//!
//! ResolverConfig { query, lookup, bind: RetryPolicy }
//!      └─► resolver::EndpointResolver per-stage budgets
//! ```
//!
//! ## Defaults
//! - `RestartPolicy::default()` → 5 restarts, 10s fast-failure threshold, immediate restart.
//! - `BackoffPolicy::default()` → zero delay.

mod backoff;
mod jitter;
mod restart;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use restart::{Restart, RestartPolicy};
pub use retry::RetryPolicy;
