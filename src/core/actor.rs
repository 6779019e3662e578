//! # ServiceActor: restart supervisor for one service.
//!
//! Runs one [`ServiceSpec`] in a crash-loop-aware restart loop:
//! - restarts per [`RestartPolicy`](crate::RestartPolicy) (fast vs slow failures),
//! - delays per the policy's backoff,
//! - cooperative cancellation via [`CancellationToken`].
//!
//! ## Event flow
//! ```text
//! ServiceStarting → [run] → ServiceStopped                     (quit was requested)
//!                         → ServiceFailed → RestartScheduled → [sleep] → next run
//!                         → ServiceFailed → RestartsExhausted  (terminal value sent)
//! ```
//!
//! ## Architecture
//! ```text
//! loop {
//!   ├─► publish ServiceStarting; started = Instant::now()
//!   ├─► service.run(ctx)                                  (a panic is a failed run)
//!   ├─► quit? ─► close gate, ServiceStopped, return        (no terminal value)
//!   ├─► publish ServiceFailed (Ok(()) counts as UnexpectedExit)
//!   ├─► policy.next(failures, elapsed)
//!   │     ├─► Fresh       → failures = 0
//!   │     ├─► Retry{n}    → failures = n
//!   │     └─► Exhausted   → close gate, RestartsExhausted, send terminal, return
//!   └─► publish RestartScheduled; sleep(backoff) or quit
//! }
//! ```
//!
//! ## Rules
//! - Runs are **sequential** within one actor.
//! - The terminal channel receives **at most one** value, and none on the graceful path.
//! - The gate is closed on every exit path unless it was already fired.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{select, sync::oneshot, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{RuntimeError, ServiceError, panic_message},
    events::{Bus, Event, EventKind},
    policies::Restart,
    readiness::ReadinessGate,
    services::{ServiceContext, ServiceSpec},
};

/// Supervises the runs of a single service.
pub struct ServiceActor {
    spec: ServiceSpec,
    bus: Bus,
    name: Arc<str>,
}

impl ServiceActor {
    /// Creates a new actor for `spec`.
    pub fn new(spec: ServiceSpec, bus: Bus) -> Self {
        let name = Arc::from(spec.name());
        Self { spec, bus, name }
    }

    /// Runs the restart loop until cancellation or until restarts are exhausted.
    pub async fn run(self, quit: CancellationToken, terminal: oneshot::Sender<RuntimeError>) {
        let policy = self.spec.restart();
        let ready = self.spec.ready();
        let mut failures: u32 = 0;
        let mut run: u32 = 0;

        loop {
            if quit.is_cancelled() {
                return self.stopped(&ready);
            }

            run += 1;
            self.bus.publish(
                Event::new(EventKind::ServiceStarting)
                    .with_service(Arc::clone(&self.name))
                    .with_attempt(run),
            );

            let ctx = ServiceContext {
                port: Arc::clone(self.spec.port()),
                ready: ready.clone(),
                quit: quit.clone(),
                bus: self.bus.clone(),
            };
            let started = time::Instant::now();
            let res = AssertUnwindSafe(self.spec.service().run(ctx))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(ServiceError::Fail {
                        error: format!("panicked: {}", panic_message(&*panic)),
                    })
                });
            let ran_for = started.elapsed();

            if quit.is_cancelled() {
                return self.stopped(&ready);
            }

            let err = res.err().unwrap_or(ServiceError::UnexpectedExit);
            self.bus.publish(
                Event::new(EventKind::ServiceFailed)
                    .with_service(Arc::clone(&self.name))
                    .with_attempt(run)
                    .with_delay(ran_for)
                    .with_reason(err.to_string()),
            );

            failures = match policy.next(failures, ran_for) {
                Restart::Fresh => 0,
                Restart::Retry { failures } => failures,
                Restart::Exhausted => {
                    ready.close();
                    self.bus.publish(
                        Event::new(EventKind::RestartsExhausted)
                            .with_service(Arc::clone(&self.name))
                            .with_attempt(failures)
                            .with_reason(err.to_string()),
                    );
                    let _ = terminal.send(RuntimeError::RestartsExhausted {
                        service: self.name.to_string(),
                        restarts: failures,
                        last: err,
                    });
                    return;
                }
            };

            let delay = policy.backoff.next(failures);
            self.bus.publish(
                Event::new(EventKind::RestartScheduled)
                    .with_service(Arc::clone(&self.name))
                    .with_attempt(failures)
                    .with_delay(delay),
            );

            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = quit.cancelled() => return self.stopped(&ready),
            }
        }
    }

    fn stopped(&self, ready: &ReadinessGate) {
        ready.close();
        self.bus
            .publish(Event::new(EventKind::ServiceStopped).with_service(Arc::clone(&self.name)));
    }
}

/// Handle to a running restart supervisor.
pub struct Supervised {
    name: Arc<str>,
    ready: ReadinessGate,
    /// Receives the terminal error, if the supervisor gives up.
    pub terminal: oneshot::Receiver<RuntimeError>,
    /// The supervisor task.
    pub handle: JoinHandle<()>,
}

impl Supervised {
    /// Service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The service's readiness gate.
    pub fn ready(&self) -> ReadinessGate {
        self.ready.clone()
    }
}

/// Spawns a restart supervisor for `spec` and returns its handle.
///
/// ```rust
/// use carousel::{core::supervise, Bus, Config, ServiceContext, ServiceError, ServiceFn, ServiceSpec};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let svc = ServiceFn::arc("idle", |ctx: ServiceContext| async move {
///         ctx.ready.try_fire();
///         ctx.quit.cancelled().await;
///         Err::<(), _>(ServiceError::Canceled)
///     });
///     let quit = CancellationToken::new();
///     let spec = ServiceSpec::with_defaults(svc, "14:0", &Config::default());
///     let sup = supervise(spec, Bus::default(), quit.clone());
///
///     assert!(sup.ready().wait().await);
///     quit.cancel();
///     sup.handle.await.unwrap();
///     assert!(sup.terminal.await.is_err());
/// }
/// ```
pub fn supervise(spec: ServiceSpec, bus: Bus, quit: CancellationToken) -> Supervised {
    let (tx, terminal) = oneshot::channel();
    let name = Arc::from(spec.name());
    let ready = spec.ready();
    let handle = tokio::spawn(ServiceActor::new(spec, bus).run(quit, tx));
    Supervised {
        name,
        ready,
        terminal,
        handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::RestartPolicy;
    use crate::readiness::GateState;
    use crate::services::{ServiceFn, ServiceRef};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn failing_every(
        runs: Arc<AtomicU32>,
        ran_for: impl Fn(u32) -> Duration + Send + Sync + 'static,
    ) -> ServiceRef {
        let ran_for = Arc::new(ran_for);
        ServiceFn::arc("synth", move |_ctx: ServiceContext| {
            let n = runs.fetch_add(1, Ordering::SeqCst) + 1;
            let d = ran_for(n);
            async move {
                time::sleep(d).await;
                Err::<(), _>(ServiceError::Fail {
                    error: format!("run {n} crashed"),
                })
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn crash_loop_gives_up_after_max_restarts() {
        let runs = Arc::new(AtomicU32::new(0));
        let svc = failing_every(runs.clone(), |_| Duration::from_secs(2));
        let spec = ServiceSpec::new(svc, "14:0", RestartPolicy::default());
        let bus = Bus::new(256);
        let mut rx = bus.subscribe();
        let started = time::Instant::now();

        let sup = supervise(spec, bus, CancellationToken::new());
        let gate = sup.ready();
        let err = sup.terminal.await.expect("terminal error");
        sup.handle.await.unwrap();

        match err {
            RuntimeError::RestartsExhausted { service, restarts, last } => {
                assert_eq!(service, "synth");
                assert_eq!(restarts, 5);
                assert!(last.to_string().contains("run 6 crashed"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(runs.load(Ordering::SeqCst), 6);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(12) && elapsed < Duration::from_secs(13));
        assert_eq!(gate.state(), GateState::Closed);

        let mut scheduled = 0;
        let mut exhausted = 0;
        while let Ok(ev) = rx.try_recv() {
            match ev.kind {
                EventKind::RestartScheduled => scheduled += 1,
                EventKind::RestartsExhausted => exhausted += 1,
                _ => {}
            }
        }
        assert_eq!(scheduled, 5);
        assert_eq!(exhausted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_failure_resets_the_counter() {
        let runs = Arc::new(AtomicU32::new(0));
        let svc = failing_every(runs.clone(), |n| {
            if n == 6 {
                Duration::from_secs(11)
            } else {
                Duration::from_secs(1)
            }
        });
        let spec = ServiceSpec::new(svc, "14:0", RestartPolicy::default());

        let sup = supervise(spec, Bus::new(256), CancellationToken::new());
        let err = sup.terminal.await.expect("terminal error");

        assert!(matches!(err, RuntimeError::RestartsExhausted { restarts: 5, .. }));
        assert_eq!(runs.load(Ordering::SeqCst), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn clean_return_counts_as_failure() {
        let svc: ServiceRef = ServiceFn::arc("oneshot", |_ctx: ServiceContext| async {
            Ok::<(), ServiceError>(())
        });
        let policy = RestartPolicy::default().with_max_restarts(1);

        let spec = ServiceSpec::new(svc, "14:0", policy);
        let sup = supervise(spec, Bus::new(64), CancellationToken::new());
        let err = sup.terminal.await.expect("terminal error");
        match err {
            RuntimeError::RestartsExhausted { last, .. } => {
                assert!(matches!(last, ServiceError::UnexpectedExit));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_run_is_a_failed_run() {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = runs.clone();
        let svc: ServiceRef = ServiceFn::arc("panicky", move |_ctx: ServiceContext| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                if true {
                    panic!("sequencer gone");
                }
                Ok::<(), ServiceError>(())
            }
        });
        let policy = RestartPolicy::default().with_max_restarts(2);

        let spec = ServiceSpec::new(svc, "14:0", policy);
        let sup = supervise(spec, Bus::new(64), CancellationToken::new());
        let gate = sup.ready();
        let err = sup.terminal.await.expect("terminal error");
        sup.handle.await.unwrap();

        match err {
            RuntimeError::RestartsExhausted { restarts, last, .. } => {
                assert_eq!(restarts, 2);
                assert!(last.to_string().contains("panicked: sequencer gone"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(gate.state(), GateState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_is_graceful() {
        let svc: ServiceRef = ServiceFn::arc("idle", |ctx: ServiceContext| async move {
            ctx.quit.cancelled().await;
            Err::<(), _>(ServiceError::Canceled)
        });
        let quit = CancellationToken::new();
        let spec = ServiceSpec::new(svc, "14:0", RestartPolicy::default());
        let sup = supervise(spec, Bus::new(64), quit.clone());
        let gate = sup.ready();

        time::sleep(Duration::from_secs(1)).await;
        quit.cancel();
        sup.handle.await.unwrap();

        assert!(sup.terminal.await.is_err());
        assert_eq!(gate.state(), GateState::Closed);
        assert!(!gate.wait().await);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_backoff_is_graceful() {
        let runs = Arc::new(AtomicU32::new(0));
        let svc = failing_every(runs.clone(), |_| Duration::from_millis(100));
        let policy = RestartPolicy::default()
            .with_backoff(crate::policies::BackoffPolicy::constant(Duration::from_secs(60)));
        let quit = CancellationToken::new();
        let spec = ServiceSpec::new(svc, "14:0", policy);
        let sup = supervise(spec, Bus::new(64), quit.clone());

        time::sleep(Duration::from_secs(1)).await;
        quit.cancel();
        sup.handle.await.unwrap();

        assert!(sup.terminal.await.is_err());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fired_gate_survives_shutdown() {
        let svc: ServiceRef = ServiceFn::arc("ready", |ctx: ServiceContext| async move {
            assert!(ctx.ready.try_fire());
            assert!(!ctx.ready.try_fire());
            ctx.quit.cancelled().await;
            Err::<(), _>(ServiceError::Canceled)
        });
        let quit = CancellationToken::new();
        let spec = ServiceSpec::new(svc, "14:0", RestartPolicy::default());
        let sup = supervise(spec, Bus::new(64), quit.clone());
        let gate = sup.ready();

        assert!(gate.wait().await);
        quit.cancel();
        sup.handle.await.unwrap();
        assert_eq!(gate.state(), GateState::Signaled);
    }
}
