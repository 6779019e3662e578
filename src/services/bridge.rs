//! # Synthesizer bridge service.
//!
//! Owns the synthesizer process and, while it runs, connects the well-known
//! port to the endpoint the synthesizer registers.
//!
//! ```text
//! spawn synth
//! loop select {
//!   synth exited          ─► return its outcome
//!   connect done (once)   ─► Ok: keep waiting; Err: kill synth, return Connect(err)
//!   quit                  ─► kill synth, return Canceled
//! }
//! ```
//!
//! Readiness is fired by the resolver on the first successful bind. A restart
//! of the synthesizer does not reconnect: past the first bind nobody waits on
//! the gate anymore.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    config::ResolverConfig,
    error::{ResolveError, ServiceError},
    resolver::{EndpointResolver, Registry},
    services::{
        command::{CommandSpec, OwnedProcess},
        service::{Service, ServiceContext},
    },
};

/// Synthesizer process plus endpoint binding.
#[derive(Clone)]
pub struct BridgeService {
    name: Cow<'static, str>,
    synth: CommandSpec,
    registry: Arc<dyn Registry>,
    label: String,
    resolver: ResolverConfig,
}

impl BridgeService {
    /// Creates a bridge that runs `synth` and binds to the endpoint labelled `label`.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        synth: CommandSpec,
        registry: Arc<dyn Registry>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            synth,
            registry,
            label: label.into(),
            resolver: ResolverConfig::default(),
        }
    }

    /// Overrides the connection protocol budgets.
    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }
}

#[async_trait]
impl Service for BridgeService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: ServiceContext) -> Result<(), ServiceError> {
        let mut proc = OwnedProcess::spawn(&self.synth)?;

        let resolver = EndpointResolver::new(
            Arc::clone(&self.registry),
            self.label.clone(),
            self.resolver,
            ctx.bus.clone(),
        )
        .with_owner(&*self.name);
        let connect = resolver.connect(&ctx.port, &ctx.ready, &ctx.quit);
        tokio::pin!(connect);
        let mut connecting = true;

        loop {
            tokio::select! {
                res = proc.wait() => return res,
                bound = &mut connect, if connecting => {
                    connecting = false;
                    match bound {
                        Ok(binding) => {
                            debug!(service = %self.name, source = %binding.source, target = %binding.target, "connected");
                        }
                        Err(ResolveError::Canceled) => {}
                        Err(e) => {
                            if let Err(stop) = proc.terminate().await {
                                debug!(service = %self.name, error = %stop, "synth stopped");
                            }
                            return Err(ServiceError::Connect(e));
                        }
                    }
                }
                _ = ctx.quit.cancelled() => {
                    if let Err(e) = proc.terminate().await {
                        debug!(service = %self.name, error = %e, "synth stopped");
                    }
                    return Err(ServiceError::Canceled);
                }
            }
        }
    }
}
