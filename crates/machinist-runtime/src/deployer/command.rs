//! Deployer that runs a shell command without preparing a workspace.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use super::Deployer;
use crate::{Error, MachineSpec, Result, TRACING_TARGET_DEPLOYER};

/// Runs `sh -c <script>` with the machine name and GPU in the environment.
///
/// Useful for dry runs and for driving the job manager with a known
/// output sequence. The script sees `MACHINE_NAME` and `MACHINE_GPU`.
#[derive(Debug, Clone)]
pub struct CommandDeployer {
    script: String,
}

impl CommandDeployer {
    /// Creates a deployer running the given shell script.
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
        }
    }

    /// Returns the shell script.
    pub fn script(&self) -> &str {
        &self.script
    }
}

#[async_trait]
impl Deployer for CommandDeployer {
    async fn spawn(&self, spec: &MachineSpec) -> Result<Child> {
        tracing::debug!(
            target: TRACING_TARGET_DEPLOYER,
            machine_name = %spec.machine_name,
            "spawning shell command"
        );

        Command::new("sh")
            .arg("-c")
            .arg(&self.script)
            .env("MACHINE_NAME", &spec.machine_name)
            .env("MACHINE_GPU", spec.gpu.as_ref())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::spawn("sh", e))
    }
}
