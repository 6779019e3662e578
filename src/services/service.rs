//! # Service abstraction.
//!
//! A [`Service`] is one external process's whole run: start it, wait for it,
//! report how it ended. The restart supervisor calls [`Service::run`] in a loop.
//!
//! Every run receives a [`ServiceContext`]:
//! - `port`: the stable, well-known port the service works against
//! - `ready`: the service's readiness gate (fire at most once; repeats are no-ops)
//! - `quit`: cancellation; the run must return promptly once it fires
//! - `bus`: diagnostics sink

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::events::Bus;
use crate::readiness::ReadinessGate;

/// Per-run inputs handed to a [`Service`].
#[derive(Clone, Debug)]
pub struct ServiceContext {
    /// Well-known port.
    pub port: Arc<str>,
    /// Readiness gate shared with downstream consumers.
    pub ready: ReadinessGate,
    /// Cancellation for this run.
    pub quit: CancellationToken,
    /// Event bus.
    pub bus: Bus,
}

/// # Supervised, cancelable unit of work.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use carousel::{Service, ServiceContext, ServiceError};
///
/// struct Idle;
///
/// #[async_trait]
/// impl Service for Idle {
///     fn name(&self) -> &str { "idle" }
///
///     async fn run(&self, ctx: ServiceContext) -> Result<(), ServiceError> {
///         ctx.ready.try_fire();
///         ctx.quit.cancelled().await;
///         Err(ServiceError::Canceled)
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Returns a stable, human-readable service name.
    fn name(&self) -> &str;

    /// Runs the service once, until its process ends or `ctx.quit` fires.
    async fn run(&self, ctx: ServiceContext) -> Result<(), ServiceError>;
}

/// Shared handle to a service.
pub type ServiceRef = Arc<dyn Service>;
