//! Deployer that runs the platform CLI inside a prepared workspace.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use super::{Deployer, DeployerConfig, workspace};
use crate::{Error, MachineSpec, Result, TRACING_TARGET_DEPLOYER};

/// Copies the machine template, writes the machine files and spawns the
/// configured platform CLI in the resulting directory.
#[derive(Debug, Clone)]
pub struct ProcessDeployer {
    config: Arc<DeployerConfig>,
}

impl ProcessDeployer {
    /// Creates a deployer with the given configuration.
    pub fn new(config: DeployerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Returns the deployer configuration.
    pub fn config(&self) -> &DeployerConfig {
        &self.config
    }
}

#[async_trait]
impl Deployer for ProcessDeployer {
    async fn spawn(&self, spec: &MachineSpec) -> Result<Child> {
        let workspace = workspace::prepare(&self.config, spec).await?;

        tracing::info!(
            target: TRACING_TARGET_DEPLOYER,
            machine_name = %spec.machine_name,
            program = %self.config.program,
            args = %self.config.args,
            workspace = %workspace.display(),
            "spawning deploy process"
        );

        Command::new(&self.config.program)
            .args(self.config.args())
            .current_dir(&workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::spawn(&self.config.program, e))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::Gpu;

    #[tokio::test]
    async fn runs_program_inside_workspace() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let template = root.path().join("template");
        tokio::fs::create_dir_all(&template).await?;
        tokio::fs::write(template.join("app.py"), "").await?;

        let config = DeployerConfig::default()
            .with_dirs(&template, root.path().join("builds"))
            .with_command("cat", "config.json");
        let deployer = ProcessDeployer::new(config);

        let mut child = deployer.spawn(&MachineSpec::new("gpu-box", Gpu::T4)).await?;
        let mut stdout = String::new();
        child
            .stdout
            .take()
            .unwrap()
            .read_to_string(&mut stdout)
            .await?;
        assert!(child.wait().await?.success());
        assert!(stdout.contains("\"machine_name\": \"gpu-box\""));
        Ok(())
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let template = root.path().join("template");
        tokio::fs::create_dir_all(&template).await?;

        let config = DeployerConfig::default()
            .with_dirs(&template, root.path().join("builds"))
            .with_command("machinist-no-such-program", "");
        let error = ProcessDeployer::new(config)
            .spawn(&MachineSpec::new("gpu-box", Gpu::T4))
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Spawn { .. }));
        Ok(())
    }
}
