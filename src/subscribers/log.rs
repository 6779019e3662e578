//! # LogWriter — renders runtime events as `tracing` records
//!
//! One line per event, with the event's metadata attached as structured fields.
//! Restarts, resolver retries and terminal failures are the operator-facing
//! diagnostic lines; routine lifecycle events are logged at `debug`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  carousel: service starting service="synth" attempt=1
//! WARN  carousel: restart scheduled service="synth" failures=1 delay_ms=0
//! WARN  carousel: resolver retry service="synth" attempt=2 delay_ms=500 reason="lookup: ..."
//! INFO  carousel: endpoint bound service="synth" binding="14:0 -> 128:0"
//! ERROR carousel: restarts exhausted service="synth" restarts=5 reason="..."
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let service = e.service.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::AllStarted => {
                info!(services = ?e.attempt, "all services started");
            }
            EventKind::ShutdownRequested => {
                info!(reason, "shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                info!("all services stopped within grace");
            }
            EventKind::GraceExceeded => {
                error!("grace period exceeded");
            }
            EventKind::ServiceStarting => {
                info!(service, attempt = ?e.attempt, "service starting");
            }
            EventKind::ServiceStopped => {
                debug!(service, "service stopped as requested");
            }
            EventKind::ServiceFailed => {
                warn!(service, attempt = ?e.attempt, ran_ms = ?e.delay_ms, reason, "service failed");
            }
            EventKind::RestartScheduled => {
                warn!(service, failures = ?e.attempt, delay_ms = ?e.delay_ms, "restart scheduled");
            }
            EventKind::RestartsExhausted => {
                error!(service, restarts = ?e.attempt, reason, "restarts exhausted");
            }
            EventKind::ServiceReady => {
                info!(service, "service ready");
            }
            EventKind::ResolverRetry => {
                warn!(service, attempt = ?e.attempt, delay_ms = ?e.delay_ms, reason, "resolver retry");
            }
            EventKind::EndpointBound => {
                info!(service, binding = reason, "endpoint bound");
            }
            EventKind::TrackStarted => {
                debug!(service, track = reason, "track started");
            }
            EventKind::SubscriberOverflow => {
                warn!(subscriber = service, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                warn!(subscriber = service, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
