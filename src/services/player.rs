//! # Track player workload.
//!
//! Waits until the bridge reports the port bound, then plays the tracks in
//! order, forever, one player process at a time:
//!
//! ```text
//! ready.wait_or_cancel(quit)
//!   ├─ closed (never fired) ─► Err(NotReady)
//!   ├─ quit                 ─► Err(Canceled)
//!   └─ fired ─► loop { for track: aplaymidi --port <port> <track> }
//! ```
//!
//! A failing track run ends the workload with that error. An empty track list
//! finishes immediately.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    error::ServiceError,
    events::{Event, EventKind},
    readiness::ReadinessGate,
    services::{
        command::{CommandSpec, OwnedProcess},
        workload::{Workload, WorkloadContext},
    },
};

/// Plays tracks through a port once a dependency is ready.
#[derive(Clone, Debug)]
pub struct Player {
    name: Cow<'static, str>,
    program: String,
    port: Arc<str>,
    tracks: Vec<PathBuf>,
    ready: ReadinessGate,
    dependency: String,
}

impl Player {
    /// Creates a player for `tracks` gated on `ready`, using `aplaymidi`.
    pub fn new(ready: ReadinessGate, port: impl Into<Arc<str>>, tracks: Vec<PathBuf>) -> Self {
        Self {
            name: Cow::Borrowed("player"),
            program: "aplaymidi".to_string(),
            port: port.into(),
            tracks,
            ready,
            dependency: "synth".to_string(),
        }
    }

    /// Uses a different player executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Names the service the gate belongs to, for diagnostics.
    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependency = dependency.into();
        self
    }

    fn track_command(&self, track: &Path) -> CommandSpec {
        CommandSpec::new(&self.program)
            .args(["--port", &*self.port])
            .arg(track.to_string_lossy())
    }
}

#[async_trait]
impl Workload for Player {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: WorkloadContext) -> Result<(), ServiceError> {
        if self.tracks.is_empty() {
            return Ok(());
        }
        if !self.ready.wait_or_cancel(&ctx.quit).await {
            if ctx.quit.is_cancelled() {
                return Err(ServiceError::Canceled);
            }
            return Err(ServiceError::NotReady {
                dependency: self.dependency.clone(),
            });
        }

        loop {
            for track in &self.tracks {
                if ctx.quit.is_cancelled() {
                    return Err(ServiceError::Canceled);
                }
                ctx.bus.publish(
                    Event::new(EventKind::TrackStarted)
                        .with_service(&*self.name)
                        .with_reason(track.to_string_lossy().into_owned()),
                );

                let mut proc = OwnedProcess::spawn(&self.track_command(track))?;
                tokio::select! {
                    res = proc.wait() => res?,
                    _ = ctx.quit.cancelled() => {
                        if let Err(e) = proc.terminate().await {
                            debug!(track = %track.display(), error = %e, "playback stopped");
                        }
                        return Err(ServiceError::Canceled);
                    }
                }
            }
        }
    }
}
