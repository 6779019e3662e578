//! # carousel
//!
//! **Carousel** supervises the worker processes of a continuous music and
//! light show: a synthesizer that has to be running and wired up before a
//! player can push tracks through it, forever, until someone stops the show.
//!
//! It provides a crash-loop-aware restart supervisor per service, a bounded
//! retry protocol that discovers and binds a runtime endpoint, a one-shot
//! readiness gate between the two, and an orchestrator that shuts the whole
//! group down on the first fatal error, workload end, or stop request.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐        ┌──────────────┐
//!     │ ServiceSpec  │   │ ServiceSpec  │        │   Workload   │
//!     │   (synth)    │   │    (...)     │        │   (player)   │
//!     └──────┬───────┘   └──────┬───────┘        └──────┬───────┘
//!            ▼                  ▼                       ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Orchestrator                                                     │
//! │  - Bus (broadcast events)                                         │
//! │  - AliveTracker (services still running)                          │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! │  - first_trigger: select over terminal errors, workload, stop     │
//! └──────┬──────────────────┬───────────────────────────┬─────────────┘
//!        ▼                  ▼                           ▼
//!     ┌──────────────┐   ┌──────────────┐        ┌──────────────┐
//!     │ ServiceActor │   │ ServiceActor │        │ workload.run │
//!     │(restart loop)│   │(restart loop)│        │ (no restart) │
//!     └┬─────────────┘   └┬─────────────┘        └┬─────────────┘
//!      │ terminal: oneshot│                       │ result: oneshot
//!      │ ready: gate ─────┼───────────────────────► wait_or_cancel
//!      ▼                  ▼                       ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                    (capacity: Config::bus_capacity)               │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───┬────────────────┬───┘
//!                           ▼                ▼
//!                    AliveTracker     SubscriberSet ──► LogWriter, ...
//! ```
//!
//! ### Bridge service
//! ```text
//! BridgeService::run(ctx)
//!   ├─► spawn synth (own process group, stderr captured)
//!   └─► select {
//!         synth exit                       ─► run outcome
//!         EndpointResolver::connect (once) ─► bind port → fire ready
//!         quit                             ─► kill synth
//!       }
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                         |
//! |-------------------|---------------------------------------------------------------|--------------------------------------------|
//! | **Subscriber API**| Injected diagnostics sink for runtime events.                 | [`Subscribe`], [`LogWriter`]               |
//! | **Policies**      | Crash-loop ceiling, retry budgets and delays.                 | [`RestartPolicy`], [`RetryPolicy`]         |
//! | **Supervision**   | Restart loop per service and group orchestration.             | [`supervise`], [`Orchestrator`]            |
//! | **Readiness**     | One-shot, tri-state dependency signal.                        | [`ReadinessGate`]                          |
//! | **Resolver**      | Discover a labelled endpoint and bind a port to it.           | [`EndpointResolver`], [`Registry`]         |
//! | **Services**      | Closure, process and bridge services; the player workload.    | [`ServiceFn`], [`BridgeService`], [`Player`] |
//! | **Errors**        | Typed errors for services, the resolver and the runtime.      | [`ServiceError`], [`RuntimeError`]         |
//! | **Configuration** | Centralized runtime settings.                                 | [`Config`], [`ResolverConfig`]             |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use carousel::{
//!     Config, LogWriter, Orchestrator, ServiceContext, ServiceError, ServiceFn, ServiceSpec,
//!     Subscribe, WorkloadContext, WorkloadFn,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let cfg = Config::default();
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let orch = Orchestrator::new(cfg.clone(), subs);
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
//!             if ready.wait().await {
//!                 Ok(())
//!             } else {
//!                 Err(ServiceError::NotReady { dependency: "synth".into() })
//!             }
//!         }
//!     });
//!
//!     let cause = orch.run(vec![spec], player).await.unwrap();
//!     assert_eq!(cause.exit_code(), 0);
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod policies;
pub mod readiness;
pub mod resolver;
pub mod services;
pub mod subscribers;

pub use config::{Config, DEFAULT_LABEL, DEFAULT_PORT, ResolverConfig};
pub use crate::core::{Orchestrator, ServiceActor, ShutdownCause, Supervised, supervise};
pub use error::{CommandFailure, ResolveError, RuntimeError, ServiceError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, Restart, RestartPolicy, RetryPolicy};
pub use readiness::{GateState, ReadinessGate};
pub use resolver::{AlsaRegistry, Binding, EndpointResolver, Registry, find_endpoint};
pub use services::{
    BridgeService, CommandSpec, OwnedProcess, Player, ProcessService, Service, ServiceContext,
    ServiceFn, ServiceRef, ServiceSpec, Workload, WorkloadContext, WorkloadFn, WorkloadRef,
};
pub use subscribers::{AliveTracker, LogWriter, Subscribe, SubscriberSet};
