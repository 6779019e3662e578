//! # Plain supervised process.
//!
//! [`ProcessService`] runs one [`CommandSpec`] per run and kills it as soon as
//! `quit` fires. With [`ProcessService::ready_on_spawn`] the readiness gate is
//! fired right after the process started; otherwise the service never fires it.

use std::borrow::Cow;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    error::ServiceError,
    events::{Event, EventKind},
    services::{
        command::{CommandSpec, OwnedProcess},
        service::{Service, ServiceContext},
    },
};

/// A service backed by a single external command.
#[derive(Clone, Debug)]
pub struct ProcessService {
    name: Cow<'static, str>,
    command: CommandSpec,
    ready_on_spawn: bool,
}

impl ProcessService {
    /// Creates a service that runs `command`.
    pub fn new(name: impl Into<Cow<'static, str>>, command: CommandSpec) -> Self {
        Self {
            name: name.into(),
            command,
            ready_on_spawn: false,
        }
    }

    /// Fires the readiness gate once the process has been spawned.
    pub fn ready_on_spawn(mut self) -> Self {
        self.ready_on_spawn = true;
        self
    }

    /// Returns the command being supervised.
    pub fn command(&self) -> &CommandSpec {
        &self.command
    }
}

#[async_trait]
impl Service for ProcessService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: ServiceContext) -> Result<(), ServiceError> {
        let mut proc = OwnedProcess::spawn(&self.command)?;

        if self.ready_on_spawn && ctx.ready.try_fire() {
            ctx.bus
                .publish(Event::new(EventKind::ServiceReady).with_service(&*self.name));
        }

        tokio::select! {
            res = proc.wait() => res,
            _ = ctx.quit.cancelled() => {
                if let Err(e) = proc.terminate().await {
                    debug!(service = %self.name, error = %e, "stopped");
                }
                Err(ServiceError::Canceled)
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::events::Bus;
    use crate::readiness::ReadinessGate;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn ctx(quit: &CancellationToken) -> ServiceContext {
        ServiceContext {
            port: Arc::from("14:0"),
            ready: ReadinessGate::new(),
            quit: quit.clone(),
            bus: Bus::new(16),
        }
    }

    #[tokio::test]
    async fn quit_kills_the_process() {
        let svc = ProcessService::new("sleeper", CommandSpec::new("sleep").arg("30"));
        let quit = CancellationToken::new();
        let ctx = ctx(&quit);

        let q = quit.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            q.cancel();
        });
        let res = tokio::time::timeout(Duration::from_secs(5), svc.run(ctx))
            .await
            .expect("run returns promptly after quit");
        assert!(matches!(res, Err(ServiceError::Canceled)));
    }

    #[tokio::test]
    async fn ready_on_spawn_fires_the_gate() {
        let svc = ProcessService::new("true", CommandSpec::new("true")).ready_on_spawn();
        let quit = CancellationToken::new();
        let ctx = ctx(&quit);
        let gate = ctx.ready.clone();

        assert!(svc.run(ctx).await.is_ok());
        assert!(gate.is_ready());
    }

    #[tokio::test]
    async fn gate_untouched_by_default() {
        let svc = ProcessService::new("false", CommandSpec::new("false"));
        let quit = CancellationToken::new();
        let ctx = ctx(&quit);
        let gate = ctx.ready.clone();

        assert!(matches!(svc.run(ctx).await, Err(ServiceError::Exited { .. })));
        assert!(!gate.is_ready());
    }
}
