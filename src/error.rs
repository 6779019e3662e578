//! Error types used by the carousel runtime, its services and the endpoint resolver.
//!
//! This module defines the error enums that flow through the system:
//!
//! - [`ServiceError`] — outcome of one run of a supervised service.
//! - [`ResolveError`] — terminal failures of the endpoint connection protocol.
//! - [`CommandFailure`] — a single failed external command with its captured output.
//! - [`RuntimeError`] — fatal conditions raised by the supervision runtime itself.
//!
//! Every enum provides `as_label` (stable snake_case label for logs) and `as_message`.

use std::any::Any;
use std::time::Duration;
use thiserror::Error;

/// # One failed invocation of an external command.
///
/// Carries the command line that was run, a short reason, and whatever the
/// command printed (stdout and stderr combined) so that it can be reported verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("`{command}` failed: {reason}")]
pub struct CommandFailure {
    /// Command line that was executed.
    pub command: String,
    /// Short description (exit status or spawn error).
    pub reason: String,
    /// Captured diagnostic output.
    pub output: String,
}

impl CommandFailure {
    /// Creates a failure record for `command`.
    pub fn new(
        command: impl Into<String>,
        reason: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            reason: reason.into(),
            output: output.into(),
        }
    }
}

/// # Terminal failures of the endpoint connection protocol.
///
/// Individual retries are never surfaced; one of these is produced only once a
/// retry budget is spent (or the protocol was cancelled).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The registry could not be listed within the attempt budget.
    #[error("listing endpoints failed {attempts} times: {output}")]
    QueryExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Diagnostic output of the last attempt.
        output: String,
    },

    /// No endpoint carrying the label showed up within the attempt budget.
    #[error("no endpoint labelled {label:?} found after {attempts} listings")]
    EndpointNotFound {
        /// Label that was searched for.
        label: String,
        /// Number of listings inspected.
        attempts: u32,
    },

    /// Binding the two endpoints kept failing.
    #[error("binding {source_port} to {target} failed {attempts} times: {output}")]
    BindExhausted {
        /// Well-known source port.
        source_port: String,
        /// Discovered target endpoint id.
        target: String,
        /// Number of attempts made.
        attempts: u32,
        /// Diagnostic output of the last attempt.
        output: String,
    },

    /// The protocol observed cancellation before completing.
    #[error("endpoint resolution cancelled")]
    Canceled,
}

impl ResolveError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use carousel::ResolveError;
    ///
    /// let err = ResolveError::QueryExhausted { attempts: 5, output: "no sequencer".into() };
    /// assert_eq!(err.as_label(), "resolve_query_exhausted");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ResolveError::QueryExhausted { .. } => "resolve_query_exhausted",
            ResolveError::EndpointNotFound { .. } => "resolve_endpoint_not_found",
            ResolveError::BindExhausted { .. } => "resolve_bind_exhausted",
            ResolveError::Canceled => "resolve_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ResolveError::QueryExhausted { attempts, output } => {
                format!("query exhausted after {attempts} attempts: {output}")
            }
            ResolveError::EndpointNotFound { label, attempts } => {
                format!("endpoint {label:?} missing after {attempts} listings")
            }
            ResolveError::BindExhausted {
                source_port,
                target,
                attempts,
                output,
            } => format!("bind {source_port} -> {target} exhausted after {attempts}: {output}"),
            ResolveError::Canceled => "cancelled".to_string(),
        }
    }
}

/// # Outcome of one run of a supervised service (or of the workload).
///
/// The restart supervisor treats every value as the diagnostic of a finished run;
/// only [`RuntimeError`] values ever reach the orchestrator.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The external program could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The external program exited unsuccessfully.
    #[error("{program} exited with {status}: {diagnostics}")]
    Exited {
        /// Program that exited.
        program: String,
        /// Rendered exit status.
        status: String,
        /// Captured diagnostic stream.
        diagnostics: String,
    },

    /// The connection protocol failed.
    #[error("connection failed: {0}")]
    Connect(#[from] ResolveError),

    /// A dependency was released without ever becoming ready.
    #[error("dependency {dependency} never became ready")]
    NotReady {
        /// Name of the dependency.
        dependency: String,
    },

    /// The service returned without error although nobody asked it to stop.
    #[error("exited without error")]
    UnexpectedExit,

    /// Generic failure.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The run observed cancellation.
    #[error("context cancelled")]
    Canceled,
}

impl ServiceError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use carousel::ServiceError;
    ///
    /// let err = ServiceError::Fail { error: "boom".into() };
    /// assert_eq!(err.as_label(), "service_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Spawn { .. } => "service_spawn",
            ServiceError::Exited { .. } => "service_exited",
            ServiceError::Connect(_) => "service_connect",
            ServiceError::NotReady { .. } => "service_not_ready",
            ServiceError::UnexpectedExit => "service_unexpected_exit",
            ServiceError::Fail { .. } => "service_failed",
            ServiceError::Canceled => "service_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ServiceError::Spawn { program, source } => format!("spawn {program}: {source}"),
            ServiceError::Exited {
                program,
                status,
                diagnostics,
            } => format!("{program} {status}: {diagnostics}"),
            ServiceError::Connect(e) => format!("connect: {}", e.as_message()),
            ServiceError::NotReady { dependency } => format!("{dependency} not ready"),
            ServiceError::UnexpectedExit => "unexpected exit".to_string(),
            ServiceError::Fail { error } => format!("error: {error}"),
            ServiceError::Canceled => "context cancelled".to_string(),
        }
    }
}

/// # Fatal conditions raised by the supervision runtime.
///
/// Any of these makes the orchestrator shut the group down and exit nonzero.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A service kept failing fast and ran out of restarts.
    #[error("{service} failed {restarts} restarts in a row: {last}")]
    RestartsExhausted {
        /// Name of the service.
        service: String,
        /// Restarts performed before giving up.
        restarts: u32,
        /// Diagnostic of the final run.
        #[source]
        last: ServiceError,
    },

    /// Shutdown grace period was exceeded; remaining tasks were aborted.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Services still alive when the grace period ran out.
        stuck: Vec<String>,
    },

    /// A restart supervisor ended without reporting, before shutdown was requested.
    #[error("supervisor for {service} ended unexpectedly")]
    SupervisorLost {
        /// Name of the service.
        service: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use carousel::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::RestartsExhausted { .. } => "runtime_restarts_exhausted",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::SupervisorLost { .. } => "runtime_supervisor_lost",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::RestartsExhausted {
                service,
                restarts,
                last,
            } => format!("{service} gave up after {restarts} restarts; last: {}", last.as_message()),
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck services={stuck:?}")
            }
            RuntimeError::SupervisorLost { service } => format!("{service} supervisor lost"),
        }
    }
}

/// Renders a panic payload caught with `catch_unwind`.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_error_converts_into_service_error() {
        let err: ServiceError = ResolveError::Canceled.into();
        assert_eq!(err.as_label(), "service_connect");
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn exhausted_message_carries_last_diagnostic() {
        let err = RuntimeError::RestartsExhausted {
            service: "synth".into(),
            restarts: 5,
            last: ServiceError::Exited {
                program: "timidity".into(),
                status: "exit status: 1".into(),
                diagnostics: "no soundfont".into(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("synth"));
        assert!(msg.contains("no soundfont"));
        assert_eq!(err.as_label(), "runtime_restarts_exhausted");
    }

    #[test]
    fn panic_payloads_are_rendered() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bang")), "bang");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }
}
