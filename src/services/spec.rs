//! # Service specification for supervised execution.
//!
//! [`ServiceSpec`] bundles a service with the port it works against, its
//! [`RestartPolicy`], and the [`ReadinessGate`] downstream consumers wait on.
//!
//! The gate is created with the spec, so consumers (such as the player) can be
//! wired to it before the orchestrator starts anything.
//!
//! ## Example
//! ```rust
//! use carousel::{Config, ServiceContext, ServiceError, ServiceFn, ServiceSpec};
//!
//! let synth = ServiceFn::arc("synth", |ctx: ServiceContext| async move {
//!     ctx.quit.cancelled().await;
//!     Err::<(), _>(ServiceError::Canceled)
//! });
//! let spec = ServiceSpec::with_defaults(synth, "14:0", &Config::default());
//! let ready = spec.ready();
//! assert!(!ready.is_ready());
//! assert_eq!(spec.name(), "synth");
//! ```

use std::sync::Arc;

use crate::{
    config::Config, policies::RestartPolicy, readiness::ReadinessGate,
    services::service::ServiceRef,
};

/// Specification for running a service under supervision.
#[derive(Clone)]
pub struct ServiceSpec {
    service: ServiceRef,
    port: Arc<str>,
    restart: RestartPolicy,
    ready: ReadinessGate,
}

impl ServiceSpec {
    /// Creates a specification with an explicit restart policy.
    pub fn new(service: ServiceRef, port: impl Into<Arc<str>>, restart: RestartPolicy) -> Self {
        Self {
            service,
            port: port.into(),
            restart,
            ready: ReadinessGate::new(),
        }
    }

    /// Creates a specification inheriting the restart policy from global config.
    pub fn with_defaults(service: ServiceRef, port: impl Into<Arc<str>>, cfg: &Config) -> Self {
        Self::new(service, port, cfg.restart)
    }

    /// Returns the service.
    pub fn service(&self) -> &ServiceRef {
        &self.service
    }

    /// Convenience: returns the service name.
    pub fn name(&self) -> &str {
        self.service.name()
    }

    /// Returns the well-known port.
    pub fn port(&self) -> &Arc<str> {
        &self.port
    }

    /// Returns the restart policy.
    pub fn restart(&self) -> RestartPolicy {
        self.restart
    }

    /// Returns a handle to the service's readiness gate.
    pub fn ready(&self) -> ReadinessGate {
        self.ready.clone()
    }

    /// Returns a new spec with updated restart policy.
    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }
}
