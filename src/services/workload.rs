//! # Steady-state workload.
//!
//! The workload is the one unit the orchestrator does **not** restart: its
//! result (success or error) ends the whole run. It usually waits on a
//! service's readiness gate before doing anything.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::events::Bus;

/// Inputs handed to the workload.
#[derive(Clone, Debug)]
pub struct WorkloadContext {
    /// Cancellation; fires on shutdown.
    pub quit: CancellationToken,
    /// Event bus.
    pub bus: Bus,
}

/// A one-shot unit of work whose completion ends the run.
#[async_trait]
pub trait Workload: Send + Sync + 'static {
    /// Returns a stable, human-readable name.
    fn name(&self) -> &str;

    /// Runs to completion or until `ctx.quit` fires.
    async fn run(&self, ctx: WorkloadContext) -> Result<(), ServiceError>;
}

/// Shared handle to a workload.
pub type WorkloadRef = Arc<dyn Workload>;

/// Closure-backed [`Workload`].
///
/// ```rust
/// use carousel::{ServiceError, WorkloadContext, WorkloadFn, WorkloadRef};
///
/// let w: WorkloadRef = WorkloadFn::arc("noop", |_ctx: WorkloadContext| async {
///     Ok::<_, ServiceError>(())
/// });
/// assert_eq!(w.name(), "noop");
/// ```
pub struct WorkloadFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> WorkloadFn<F> {
    /// Creates a new function-backed workload.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the workload and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Workload for WorkloadFn<F>
where
    F: Fn(WorkloadContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: WorkloadContext) -> Result<(), ServiceError> {
        (self.f)(ctx).await
    }
}
