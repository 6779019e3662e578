//! Runtime core: supervision and orchestration.
//!
//! - restart supervision: [`ServiceActor`], [`supervise`], [`Supervised`];
//! - [`Orchestrator`]: starts every supervisor and the workload, fans in the first
//!   shutdown trigger, cancels once, and waits within the grace period;
//! - `shutdown`: OS signal handling used by [`Orchestrator::run`].

mod actor;
mod orchestrator;
mod shutdown;

pub use actor::{ServiceActor, Supervised, supervise};
pub use orchestrator::{Orchestrator, ShutdownCause};
