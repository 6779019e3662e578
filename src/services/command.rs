//! # Owned external processes.
//!
//! [`OwnedProcess`] is a child started from a [`CommandSpec`] and owned by the
//! task that spawned it:
//!
//! - it runs in its own process group, so Ctrl-C in the terminal reaches only
//!   the supervisor, which then stops children itself;
//! - stderr is captured line by line (logged at `debug`) and kept for diagnostics;
//! - [`OwnedProcess::kill`] may be called at any time, including after exit.

use std::fmt;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::ServiceError;

/// Program plus arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable name or path.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Creates a command without arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Builds a tokio [`Command`] isolated in its own process group.
    pub(crate) fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for a in &self.args {
            write!(f, " {a}")?;
        }
        Ok(())
    }
}

/// A running child process with captured diagnostics.
pub struct OwnedProcess {
    program: String,
    child: Child,
    stderr: Option<JoinHandle<String>>,
}

impl OwnedProcess {
    /// Spawns `spec` with stdin closed and stderr captured.
    pub fn spawn(spec: &CommandSpec) -> Result<Self, ServiceError> {
        let mut cmd = spec.command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| ServiceError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        debug!(program = %spec, pid = ?child.id(), "process spawned");

        let stderr = child.stderr.take().map(|stream| {
            let program = spec.program.clone();
            tokio::spawn(async move {
                let mut captured = String::new();
                let mut lines = BufReader::new(stream).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "carousel::child", %program, "{line}");
                    if !captured.is_empty() {
                        captured.push('\n');
                    }
                    captured.push_str(&line);
                }
                captured
            })
        });

        Ok(Self {
            program: spec.program.clone(),
            child,
            stderr,
        })
    }

    /// Program name, for diagnostics.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// OS process id while the child is running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Requests forceful termination; a no-op once the process has exited.
    pub fn kill(&mut self) {
        if let Err(e) = self.child.start_kill() {
            debug!(program = %self.program, error = %e, "kill ignored");
        }
    }

    /// Waits for the process to exit and maps the result.
    ///
    /// Dropping the future while the process runs leaves it running; a later
    /// call resumes waiting.
    pub async fn wait(&mut self) -> Result<(), ServiceError> {
        let status = self.child.wait().await;
        let diagnostics = match self.stderr.take() {
            Some(h) => h.await.unwrap_or_default(),
            None => String::new(),
        };
        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(ServiceError::Exited {
                program: self.program.clone(),
                status: status.to_string(),
                diagnostics,
            }),
            Err(e) => Err(ServiceError::Fail {
                error: format!("waiting for {}: {e}", self.program),
            }),
        }
    }

    /// Kills the process and waits for it to be reaped.
    pub async fn terminate(&mut self) -> Result<(), ServiceError> {
        self.kill();
        self.wait().await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn display_joins_program_and_args() {
        let spec = CommandSpec::new("aplaymidi").args(["--port", "14:0"]).arg("song.mid");
        assert_eq!(spec.to_string(), "aplaymidi --port 14:0 song.mid");
    }

    #[tokio::test]
    async fn failing_process_reports_stderr() {
        let spec = CommandSpec::new("sh").args(["-c", "echo nope >&2; exit 3"]);
        let mut proc = OwnedProcess::spawn(&spec).unwrap();
        match proc.wait().await {
            Err(ServiceError::Exited {
                program,
                diagnostics,
                ..
            }) => {
                assert_eq!(program, "sh");
                assert_eq!(diagnostics, "nope");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn kill_is_idempotent() {
        let mut proc = OwnedProcess::spawn(&CommandSpec::new("sleep").arg("30")).unwrap();
        let res = tokio::time::timeout(Duration::from_secs(5), proc.terminate())
            .await
            .expect("killed promptly");
        assert!(matches!(res, Err(ServiceError::Exited { .. })));
        proc.kill();
        proc.kill();
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let res = OwnedProcess::spawn(&CommandSpec::new("/nonexistent/carousel-test-binary"));
        assert!(matches!(res, Err(ServiceError::Spawn { .. })));
    }
}
