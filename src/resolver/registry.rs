//! # Endpoint registry collaborator.
//!
//! [`Registry`] is the narrow contract the resolver needs from the system:
//! list the active endpoints as text, and bind two endpoints together.
//! [`AlsaRegistry`] implements it with the ALSA sequencer's `aconnect` tool.

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::CommandFailure;

/// External system state query plus bind operation.
#[async_trait]
pub trait Registry: Send + Sync + 'static {
    /// Returns the textual listing of active endpoints.
    async fn list(&self) -> Result<String, CommandFailure>;

    /// Connects `source` to `target`; returns the command's output.
    async fn bind(&self, source: &str, target: &str) -> Result<String, CommandFailure>;
}

/// `aconnect`-backed registry.
#[derive(Clone, Debug)]
pub struct AlsaRegistry {
    program: String,
}

impl AlsaRegistry {
    /// Uses `aconnect` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("aconnect")
    }

    /// Uses a specific `aconnect` executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn exec(&self, args: &[&str]) -> Result<String, CommandFailure> {
        let command = format!("{} {}", self.program, args.join(" "));
        let out = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CommandFailure::new(&command, e.to_string(), e.to_string()))?;

        let mut combined = String::from_utf8_lossy(&out.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&out.stderr));

        if out.status.success() {
            Ok(combined)
        } else {
            Err(CommandFailure::new(command, out.status.to_string(), combined))
        }
    }
}

impl Default for AlsaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for AlsaRegistry {
    async fn list(&self) -> Result<String, CommandFailure> {
        self.exec(&["-l"]).await
    }

    async fn bind(&self, source: &str, target: &str) -> Result<String, CommandFailure> {
        self.exec(&[source, target]).await
    }
}
