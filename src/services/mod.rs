//! # Services and the workload.
//!
//! - [`Service`] / [`ServiceFn`]: restartable units run by the restart supervisor
//! - [`ServiceSpec`]: a service plus port, restart policy and readiness gate
//! - [`CommandSpec`] / [`OwnedProcess`]: external processes owned by one task
//! - [`ProcessService`], [`BridgeService`]: process-backed services
//! - [`Workload`] / [`WorkloadFn`] / [`Player`]: the non-restarted steady-state unit

mod bridge;
mod command;
mod player;
mod process;
mod service;
mod service_fn;
mod spec;
mod workload;

pub use bridge::BridgeService;
pub use command::{CommandSpec, OwnedProcess};
pub use player::Player;
pub use process::ProcessService;
pub use service::{Service, ServiceContext, ServiceRef};
pub use service_fn::ServiceFn;
pub use spec::ServiceSpec;
pub use workload::{Workload, WorkloadContext, WorkloadFn, WorkloadRef};
