//! # Endpoint connection protocol.
//!
//! Binds the supervisor's well-known port to an endpoint that another process
//! registers under a runtime-assigned id.
//!
//! ## Flow
//! ```text
//! loop {
//!   ├─► registry.list()                  Err ─► query budget?   ─► sleep, continue
//!   ├─► find_endpoint(listing, label)    None ─► lookup budget? ─► sleep, continue
//!   ├─► registry.bind(port, id)          Err ─► bind budget?    ─► sleep, continue
//!   └─► ready.try_fire(); return Binding
//! }
//! ```
//!
//! ## Rules
//! - Each stage has its own failure counter; a retry always restarts from the listing.
//! - Every registry call and every sleep races against `quit`.
//! - Readiness is fired once, on the first successful bind, and never on failure.
//! - A binding is never torn down or re-checked once made.

use std::sync::Arc;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ResolverConfig,
    error::{CommandFailure, ResolveError},
    events::{Bus, Event, EventKind},
    policies::RetryPolicy,
    readiness::ReadinessGate,
    resolver::{listing::find_endpoint, registry::Registry},
};

/// A connection established between two runtime endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    /// Well-known source port.
    pub source: String,
    /// Discovered target endpoint id.
    pub target: String,
}

/// Discovers a labelled endpoint and binds a port to it.
#[derive(Clone)]
pub struct EndpointResolver {
    registry: Arc<dyn Registry>,
    label: String,
    cfg: ResolverConfig,
    bus: Bus,
    owner: Arc<str>,
}

impl EndpointResolver {
    /// Creates a resolver looking for `label` in `registry` listings.
    pub fn new(
        registry: Arc<dyn Registry>,
        label: impl Into<String>,
        cfg: ResolverConfig,
        bus: Bus,
    ) -> Self {
        Self {
            registry,
            label: label.into(),
            cfg,
            bus,
            owner: Arc::from("resolver"),
        }
    }

    /// Names the service on whose behalf events are published.
    pub fn with_owner(mut self, owner: impl Into<Arc<str>>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Runs the protocol until `port` is bound, a budget is spent, or `quit` fires.
    pub async fn connect(
        &self,
        port: &str,
        ready: &ReadinessGate,
        quit: &CancellationToken,
    ) -> Result<Binding, ResolveError> {
        let (mut queries, mut lookups, mut binds) = (0u32, 0u32, 0u32);

        loop {
            if quit.is_cancelled() {
                return Err(ResolveError::Canceled);
            }

            let listed = tokio::select! {
                r = self.registry.list() => r,
                _ = quit.cancelled() => return Err(ResolveError::Canceled),
            };
            let listing = match listed {
                Ok(listing) => listing,
                Err(e) => {
                    queries += 1;
                    if self.cfg.query.exhausted(queries) {
                        return Err(ResolveError::QueryExhausted {
                            attempts: queries,
                            output: diagnostic(&e),
                        });
                    }
                    self.pause(&self.cfg.query, queries, format!("query: {e}"), quit)
                        .await?;
                    continue;
                }
            };

            let Some(target) = find_endpoint(&listing, &self.label) else {
                lookups += 1;
                if self.cfg.lookup.exhausted(lookups) {
                    return Err(ResolveError::EndpointNotFound {
                        label: self.label.clone(),
                        attempts: lookups,
                    });
                }
                let reason = format!("lookup: no endpoint labelled {:?} yet", self.label);
                self.pause(&self.cfg.lookup, lookups, reason, quit).await?;
                continue;
            };
            let target = target.to_string();

            let bound = tokio::select! {
                r = self.registry.bind(port, &target) => r,
                _ = quit.cancelled() => return Err(ResolveError::Canceled),
            };
            match bound {
                Ok(_) => {
                    let binding = Binding {
                        source: port.to_string(),
                        target,
                    };
                    self.bus.publish(
                        Event::new(EventKind::EndpointBound)
                            .with_service(Arc::clone(&self.owner))
                            .with_reason(format!("{} -> {}", binding.source, binding.target)),
                    );
                    if ready.try_fire() {
                        self.bus.publish(
                            Event::new(EventKind::ServiceReady)
                                .with_service(Arc::clone(&self.owner)),
                        );
                    }
                    return Ok(binding);
                }
                Err(e) => {
                    binds += 1;
                    if self.cfg.bind.exhausted(binds) {
                        return Err(ResolveError::BindExhausted {
                            source_port: port.to_string(),
                            target,
                            attempts: binds,
                            output: diagnostic(&e),
                        });
                    }
                    self.pause(&self.cfg.bind, binds, format!("bind: {e}"), quit)
                        .await?;
                }
            }
        }
    }

    async fn pause(
        &self,
        retry: &RetryPolicy,
        failures: u32,
        reason: String,
        quit: &CancellationToken,
    ) -> Result<(), ResolveError> {
        let delay = retry.delay(failures);
        self.bus.publish(
            Event::new(EventKind::ResolverRetry)
                .with_service(Arc::clone(&self.owner))
                .with_attempt(failures)
                .with_delay(delay)
                .with_reason(reason),
        );

        tokio::select! {
            _ = time::sleep(delay) => Ok(()),
            _ = quit.cancelled() => Err(ResolveError::Canceled),
        }
    }
}

/// Captured output, or the failure itself when the command printed nothing.
fn diagnostic(e: &CommandFailure) -> String {
    if e.output.trim().is_empty() {
        e.to_string()
    } else {
        e.output.clone()
    }
}
