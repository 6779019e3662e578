//! # Runtime events emitted by the orchestrator, restart supervisors and services.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Service lifecycle**: a supervised run starting, failing, being restarted
//! - **Connection protocol**: resolver retries and the final endpoint binding
//! - **Workload**: the steady-state player moving through its tracks
//! - **Shutdown**: the orchestrator's transition out of the running state
//!
//! The [`Event`] struct carries additional metadata such as timestamps, service
//! name, reasons, attempt counters and delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use carousel::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ServiceFailed)
//!     .with_service("synth")
//!     .with_reason("exit status: 1")
//!     .with_attempt(3)
//!     .with_delay(Duration::from_millis(500));
//!
//! assert_eq!(ev.kind, EventKind::ServiceFailed);
//! assert_eq!(ev.service.as_deref(), Some("synth"));
//! assert_eq!(ev.reason.as_deref(), Some("exit status: 1"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `service`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `service`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Orchestrator events ===
    /// All supervisors and the workload have been launched.
    ///
    /// Sets:
    /// - `attempt`: number of supervised services
    AllStarted,

    /// Shutdown triggered (fatal error, workload end, or stop request).
    ///
    /// Sets:
    /// - `reason`: human-readable trigger
    ShutdownRequested,

    /// Every task stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some tasks did not stop in time.
    GraceExceeded,

    // === Service lifecycle events ===
    /// A supervised service is starting a run.
    ///
    /// Sets:
    /// - `service`: service name
    /// - `attempt`: run number (1-based, never resets)
    ServiceStarting,

    /// A supervised service finished its run because cancellation was requested.
    ///
    /// Sets:
    /// - `service`: service name
    ServiceStopped,

    /// A supervised run ended without cancellation being requested.
    ///
    /// Sets:
    /// - `service`: service name
    /// - `attempt`: run number
    /// - `delay_ms`: how long the run lasted
    /// - `reason`: failure message
    ServiceFailed,

    /// The supervisor is about to start the service again.
    ///
    /// Sets:
    /// - `service`: service name
    /// - `attempt`: consecutive fast failures so far (0 after a slow failure)
    /// - `delay_ms`: delay before the next run
    RestartScheduled,

    /// Fast failures reached the ceiling; the supervisor gave up.
    ///
    /// Sets:
    /// - `service`: service name
    /// - `attempt`: restarts performed
    /// - `reason`: last failure message
    RestartsExhausted,

    /// The service's readiness gate was fired.
    ///
    /// Sets:
    /// - `service`: service name
    ServiceReady,

    // === Connection protocol events ===
    /// One step of the connection protocol failed and will be retried.
    ///
    /// Sets:
    /// - `service`: owning service name
    /// - `attempt`: failures counted against this stage's budget
    /// - `delay_ms`: sleep before retrying
    /// - `reason`: stage and diagnostic
    ResolverRetry,

    /// The well-known port was bound to the discovered endpoint.
    ///
    /// Sets:
    /// - `service`: owning service name
    /// - `reason`: `"<source> -> <target>"`
    EndpointBound,

    // === Workload events ===
    /// The workload started playing a track.
    ///
    /// Sets:
    /// - `service`: workload name
    /// - `reason`: track
    TrackStarted,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    /// Delay or duration in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Attempt/failure count.
    pub attempt: Option<u32>,
    /// Name of the service, if applicable.
    pub service: Option<Arc<str>>,
    /// Event classification.
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            at: SystemTime::now(),
            attempt: None,
            reason: None,
            delay_ms: None,
            service: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a service name.
    #[inline]
    pub fn with_service(mut self, service: impl Into<Arc<str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Returns the delay as a [`Duration`], if set.
    #[inline]
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(|ms| Duration::from_millis(u64::from(ms)))
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_service(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_service(subscriber)
            .with_reason(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::ServiceStarting);
        let b = Event::new(EventKind::ServiceStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn delay_is_clamped_to_u32_millis() {
        let ev = Event::new(EventKind::RestartScheduled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
        let ev = Event::new(EventKind::RestartScheduled).with_delay(Duration::from_millis(1500));
        assert_eq!(ev.delay(), Some(Duration::from_millis(1500)));
    }
}
