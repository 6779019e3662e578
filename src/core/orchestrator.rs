//! # Orchestrator: runs the services and the workload, then shuts everything down.
//!
//! The [`Orchestrator`] owns the event bus, the subscribers, and global runtime
//! configuration. It spawns one restart supervisor per service plus the
//! workload, waits for the **first** shutdown trigger, cancels everything once,
//! and waits for the group to unwind within [`Config::grace`].
//!
//! ## High-level architecture
//! ```text
//! Inputs to run():
//!   Vec<ServiceSpec> + WorkloadRef ──► Orchestrator::run_until(services, workload, stop)
//!
//! Preparation:
//!   - subscriber_listener(): Bus.subscribe() ─► AliveTracker::update + SubscriberSet::emit
//!
//! Spawn (Starting → Running):
//!   ServiceSpec[0] ... ServiceSpec[N-1]            workload
//!       │                  │                          │
//!       └──► ServiceActor::run(root.child_token(), terminal_tx[i])
//!                                      workload.run(ctx) ──► workload_tx
//!   publish AllStarted
//!
//! Fan-in (Running → ShuttingDown), first of:
//!   ├─ FuturesUnordered<terminal_rx>  ─► ServiceFailed(err)       exit 1
//!   │    (a closed receiver is SupervisorLost)
//!   ├─ workload_rx                    ─► WorkloadFinished / WorkloadFailed
//!   └─ stop.cancelled()               ─► StopRequested            exit 0
//!
//! Shutdown (ShuttingDown → Stopped):
//!   publish ShutdownRequested ─► root.cancel() ─► wait_all_with_grace(cfg.grace):
//!        ├─ Ok (all joined)    → publish AllStoppedWithin
//!        └─ Timeout exceeded   → publish GraceExceeded; Err(GraceExceeded{stuck})
//! ```
//!
//! Later triggers are ignored: the root token is cancelled exactly once.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use carousel::{
//!     Config, Orchestrator, ServiceContext, ServiceError, ServiceFn, ServiceSpec,
//!     ShutdownCause, WorkloadContext, WorkloadFn,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut cfg = Config::default();
//!     cfg.grace = Duration::from_secs(5);
//!     let orch = Orchestrator::new(cfg.clone(), Vec::new());
//!
//!     let synth = ServiceFn::arc("synth", |ctx: ServiceContext| async move {
//!         ctx.ready.try_fire();
//!         ctx.quit.cancelled().await;
//!         Err::<(), _>(ServiceError::Canceled)
//!     });
//!     let spec = ServiceSpec::with_defaults(synth, "14:0", &cfg);
//!     let ready = spec.ready();
//!
//!     let player = WorkloadFn::arc("player", move |_ctx: WorkloadContext| {
//!         let ready = ready.clone();
//!         async move {
//!             assert!(ready.wait().await);
//!             Ok::<_, ServiceError>(())
//!         }
//!     });
//!
//!     let cause = orch
//!         .run_until(vec![spec], player, Default::default())
//!         .await
//!         .unwrap();
//!     assert!(matches!(cause, ShutdownCause::WorkloadFinished));
//!     assert_eq!(cause.exit_code(), 0);
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::{StreamExt, stream::FuturesUnordered};
use tokio::{
    select,
    sync::{
        broadcast::error::{RecvError, TryRecvError},
        oneshot::{self, error::RecvError as TerminalClosed},
    },
    task::{JoinHandle, JoinSet},
};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
    config::Config,
    core::{actor::ServiceActor, shutdown},
    error::{RuntimeError, ServiceError},
    events::{Bus, Event, EventKind},
    services::{ServiceSpec, WorkloadContext, WorkloadRef},
    subscribers::{AliveTracker, Subscribe, SubscriberSet},
};

/// Why the orchestrator left the running state.
#[derive(Debug)]
pub enum ShutdownCause {
    /// A service ran out of restarts.
    ServiceFailed(RuntimeError),
    /// The workload completed successfully.
    WorkloadFinished,
    /// The workload returned an error.
    WorkloadFailed(ServiceError),
    /// A stop was requested (signal or external token).
    StopRequested,
}

impl ShutdownCause {
    /// True when the cause should make the process exit nonzero.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShutdownCause::ServiceFailed(_) | ShutdownCause::WorkloadFailed(_)
        )
    }

    /// Process exit status for this cause.
    pub fn exit_code(&self) -> u8 {
        if self.is_fatal() { 1 } else { 0 }
    }

    /// Human-readable description, used as the `ShutdownRequested` reason.
    pub fn describe(&self) -> String {
        match self {
            ShutdownCause::ServiceFailed(e) => format!("service failed: {e}"),
            ShutdownCause::WorkloadFinished => "workload finished".to_string(),
            ShutdownCause::WorkloadFailed(e) => format!("workload failed: {e}"),
            ShutdownCause::StopRequested => "stop requested".to_string(),
        }
    }
}

/// Coordinates restart supervisors, the workload, event delivery, and shutdown.
pub struct Orchestrator {
    cfg: Config,
    bus: Bus,
    subscribers: Vec<Arc<dyn Subscribe>>,
    alive: Arc<AliveTracker>,
}

struct Listener {
    done: CancellationToken,
    handle: JoinHandle<()>,
}

impl Orchestrator {
    /// Creates a new orchestrator with the given config and subscribers.
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self {
            cfg,
            bus,
            subscribers,
            alive: Arc::new(AliveTracker::new()),
        }
    }

    /// Event bus shared with every supervisor and the workload.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Runs until the first trigger, treating SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere) as a stop.
    pub async fn run(
        &self,
        services: Vec<ServiceSpec>,
        workload: WorkloadRef,
    ) -> Result<ShutdownCause, RuntimeError> {
        let stop = CancellationToken::new();
        let signals = {
            let stop = stop.clone();
            tokio::spawn(async move {
                match shutdown::wait_for_shutdown_signal().await {
                    Ok(()) => stop.cancel(),
                    Err(e) => warn!(error = %e, "signal handlers unavailable; stop requests ignored"),
                }
            })
        };

        let res = self.run_until(services, workload, stop).await;
        signals.abort();
        res
    }

    /// Runs until the first trigger, with `stop` as the external stop request.
    pub async fn run_until(
        &self,
        services: Vec<ServiceSpec>,
        workload: WorkloadRef,
        stop: CancellationToken,
    ) -> Result<ShutdownCause, RuntimeError> {
        let listener = self.subscriber_listener();
        let root = CancellationToken::new();
        let mut set = JoinSet::new();

        let count = services.len();
        let mut terminals = FuturesUnordered::new();
        for spec in services {
            let (tx, rx) = oneshot::channel();
            let name: Arc<str> = Arc::from(spec.name());
            let actor = ServiceActor::new(spec, self.bus.clone());
            set.spawn(actor.run(root.child_token(), tx));
            terminals.push(async move { (name, rx.await) });
        }

        let (workload_tx, workload_rx) = oneshot::channel();
        let ctx = WorkloadContext {
            quit: root.child_token(),
            bus: self.bus.clone(),
        };
        set.spawn(async move {
            let _ = workload_tx.send(workload.run(ctx).await);
        });

        self.bus.publish(
            Event::new(EventKind::AllStarted).with_attempt(u32::try_from(count).unwrap_or(u32::MAX)),
        );

        let cause = Self::first_trigger(&mut terminals, workload_rx, &stop).await;
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(cause.describe()));
        root.cancel();

        let res = self.wait_all_with_grace(&mut set).await;
        drop(set);
        Self::stop_listener(listener).await;
        res.map(|()| cause)
    }

    /// Waits for the first of: a terminal service error, the workload result, a stop request.
    ///
    /// Supervisors only drop their terminal sender after cancellation, so a
    /// receiver closing here means the supervisor died and is fatal too.
    async fn first_trigger<F>(
        terminals: &mut FuturesUnordered<F>,
        workload: oneshot::Receiver<Result<(), ServiceError>>,
        stop: &CancellationToken,
    ) -> ShutdownCause
    where
        F: Future<Output = (Arc<str>, Result<RuntimeError, TerminalClosed>)>,
    {
        let fatal = async {
            match terminals.next().await {
                Some((_, Ok(err))) => Some(err),
                Some((service, Err(_))) => Some(RuntimeError::SupervisorLost {
                    service: service.to_string(),
                }),
                None => None,
            }
        };

        select! {
            Some(err) = fatal => ShutdownCause::ServiceFailed(err),
            res = workload => match res {
                Ok(Ok(())) => ShutdownCause::WorkloadFinished,
                Ok(Err(e)) => ShutdownCause::WorkloadFailed(e),
                Err(_) => ShutdownCause::WorkloadFailed(ServiceError::Fail {
                    error: "workload ended without a result".to_string(),
                }),
            },
            _ = stop.cancelled() => ShutdownCause::StopRequested,
        }
    }

    /// Subscribes to the bus and forwards events to the alive tracker and subscribers.
    fn subscriber_listener(&self) -> Listener {
        let mut rx = self.bus.subscribe();
        let set = SubscriberSet::new(self.subscribers.clone(), self.bus.clone());
        let alive = Arc::clone(&self.alive);
        let done = CancellationToken::new();
        let stop = done.clone();

        let handle = tokio::spawn(async move {
            let deliver = |ev: &Event| {
                alive.update(ev);
                set.emit(ev);
            };
            loop {
                select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => deliver(&ev),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "event listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => {
                        loop {
                            match rx.try_recv() {
                                Ok(ev) => deliver(&ev),
                                Err(TryRecvError::Lagged(_)) => continue,
                                Err(_) => break,
                            }
                        }
                        break;
                    }
                }
            }
            set.shutdown().await;
        });

        Listener { done, handle }
    }

    async fn stop_listener(listener: Listener) {
        listener.done.cancel();
        if let Err(e) = listener.handle.await {
            warn!(error = %e, "event listener ended abnormally");
        }
    }

    /// Waits for every task to finish within the configured grace period.
    ///
    /// Publishes [`EventKind::AllStoppedWithin`] on success, or
    /// [`EventKind::GraceExceeded`] on timeout and returns
    /// [`RuntimeError::GraceExceeded`] with the services still alive.
    async fn wait_all_with_grace(&self, set: &mut JoinSet<()>) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        let done = async { while set.join_next().await.is_some() {} };

        match tokio::time::timeout(grace, done).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                self.bus.publish(Event::new(EventKind::GraceExceeded));
                let stuck = self.alive.snapshot();
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::RestartPolicy;
    use crate::services::{ServiceContext, ServiceFn, ServiceRef, WorkloadFn};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    impl Recorder {
        fn count(&self, kind: EventKind) -> usize {
            self.seen.lock().unwrap().iter().filter(|k| **k == kind).count()
        }
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.seen.lock().unwrap().push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    fn idle(name: &'static str, cancelled: Arc<AtomicU32>) -> ServiceRef {
        ServiceFn::arc(name, move |ctx: ServiceContext| {
            let cancelled = cancelled.clone();
            async move {
                ctx.quit.cancelled().await;
                cancelled.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ServiceError::Canceled)
            }
        })
    }

    fn waiting_workload() -> WorkloadRef {
        WorkloadFn::arc("player", |ctx: WorkloadContext| async move {
            ctx.quit.cancelled().await;
            Err::<(), _>(ServiceError::Canceled)
        })
    }

    fn spec(svc: ServiceRef) -> ServiceSpec {
        ServiceSpec::new(svc, "14:0", RestartPolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn one_failing_service_shuts_down_the_group() {
        let rec = Arc::new(Recorder::default());
        let orch = Orchestrator::new(Config::default(), vec![rec.clone()]);
        let cancelled = Arc::new(AtomicU32::new(0));

        let broken: ServiceRef = ServiceFn::arc("broken", |_ctx: ServiceContext| async {
            Err::<(), _>(ServiceError::Fail {
                error: "boom".into(),
            })
        });
        let services = vec![
            spec(idle("a", cancelled.clone())),
            spec(broken).with_restart(RestartPolicy::default().with_max_restarts(0)),
            spec(idle("c", cancelled.clone())),
        ];

        let cause = orch
            .run_until(services, waiting_workload(), CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(cause, ShutdownCause::ServiceFailed(_)));
        assert_eq!(cause.exit_code(), 1);
        assert_eq!(cancelled.load(Ordering::SeqCst), 2);
        assert_eq!(rec.count(EventKind::ShutdownRequested), 1);
        assert_eq!(rec.count(EventKind::AllStoppedWithin), 1);
        assert_eq!(rec.count(EventKind::ServiceStopped), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn crash_looping_service_stops_a_healthy_group() {
        let rec = Arc::new(Recorder::default());
        let orch = Orchestrator::new(Config::default(), vec![rec.clone()]);
        let cancelled = Arc::new(AtomicU32::new(0));
        let runs = Arc::new(AtomicU32::new(0));

        let counter = runs.clone();
        let crashing: ServiceRef = ServiceFn::arc("a", move |_ctx: ServiceContext| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                time::sleep(Duration::from_secs(2)).await;
                Err::<(), _>(ServiceError::Fail {
                    error: "crashed".into(),
                })
            }
        });
        let services = vec![spec(crashing), spec(idle("b", cancelled.clone()))];

        let cause = orch
            .run_until(services, waiting_workload(), CancellationToken::new())
            .await
            .unwrap();

        match &cause {
            ShutdownCause::ServiceFailed(RuntimeError::RestartsExhausted {
                service, restarts, ..
            }) => {
                assert_eq!(service, "a");
                assert_eq!(*restarts, 5);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(cause.exit_code(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 6);
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
        assert_eq!(rec.count(EventKind::RestartScheduled), 5);
        assert_eq!(rec.count(EventKind::RestartsExhausted), 1);
        assert_eq!(rec.count(EventKind::ShutdownRequested), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_service_still_shuts_the_group_down() {
        let orch = Orchestrator::new(Config::default(), Vec::new());

        let panicky: ServiceRef = ServiceFn::arc("synth", |_ctx: ServiceContext| async {
            if true {
                panic!("synth blew up");
            }
            Ok::<(), ServiceError>(())
        });
        let spec = spec(panicky);
        let ready = spec.ready();
        let player = WorkloadFn::arc("player", move |ctx: WorkloadContext| {
            let ready = ready.clone();
            async move {
                if ready.wait_or_cancel(&ctx.quit).await {
                    ctx.quit.cancelled().await;
                }
                Err::<(), _>(ServiceError::NotReady {
                    dependency: "synth".into(),
                })
            }
        });

        let cause = time::timeout(
            Duration::from_secs(3600),
            orch.run_until(vec![spec], player, CancellationToken::new()),
        )
        .await
        .expect("group must stop")
        .unwrap();

        assert!(cause.is_fatal());
        assert_eq!(cause.exit_code(), 1);
    }

    #[tokio::test]
    async fn lost_supervisor_is_fatal() {
        let (tx, rx) = oneshot::channel::<RuntimeError>();
        drop(tx);
        let name: Arc<str> = Arc::from("synth");
        let mut terminals = FuturesUnordered::new();
        terminals.push(async move { (name, rx.await) });
        let (_workload_tx, workload_rx) = oneshot::channel();

        let cause =
            Orchestrator::first_trigger(&mut terminals, workload_rx, &CancellationToken::new())
                .await;

        match cause {
            ShutdownCause::ServiceFailed(RuntimeError::SupervisorLost { service }) => {
                assert_eq!(service, "synth");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_request_exits_cleanly() {
        let orch = Orchestrator::new(Config::default(), Vec::new());
        let cancelled = Arc::new(AtomicU32::new(0));
        let stop = CancellationToken::new();

        let s = stop.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(1)).await;
            s.cancel();
        });
        let cause = orch
            .run_until(vec![spec(idle("a", cancelled.clone()))], waiting_workload(), stop)
            .await
            .unwrap();

        assert!(matches!(cause, ShutdownCause::StopRequested));
        assert_eq!(cause.exit_code(), 0);
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn workload_result_decides_exit_code() {
        let orch = Orchestrator::new(Config::default(), Vec::new());

        let done = WorkloadFn::arc("player", |_ctx: WorkloadContext| async {
            Ok::<_, ServiceError>(())
        });
        let cause = orch
            .run_until(Vec::new(), done, CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(cause, ShutdownCause::WorkloadFinished));
        assert_eq!(cause.exit_code(), 0);

        let failed = WorkloadFn::arc("player", |_ctx: WorkloadContext| async {
            Err::<(), _>(ServiceError::NotReady {
                dependency: "synth".into(),
            })
        });
        let cause = orch
            .run_until(Vec::new(), failed, CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(cause, ShutdownCause::WorkloadFailed(ServiceError::NotReady { .. })));
        assert_eq!(cause.exit_code(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_service_exceeds_grace() {
        let mut cfg = Config::default();
        cfg.grace = Duration::from_secs(1);
        let orch = Orchestrator::new(cfg, Vec::new());

        let stubborn: ServiceRef = ServiceFn::arc("stubborn", |_ctx: ServiceContext| async {
            time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, ServiceError>(())
        });
        let stop = CancellationToken::new();
        let s = stop.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(100)).await;
            s.cancel();
        });

        let err = orch
            .run_until(vec![spec(stubborn)], waiting_workload(), stop)
            .await
            .unwrap_err();
        match err {
            RuntimeError::GraceExceeded { grace, stuck } => {
                assert_eq!(grace, Duration::from_secs(1));
                assert_eq!(stuck, vec!["stubborn".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
