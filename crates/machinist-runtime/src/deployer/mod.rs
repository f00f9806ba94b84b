//! Deployers turn a machine specification into a running process.
//!
//! The job manager only sees a [`Deployer`] as something that yields a
//! child process with piped standard output and standard error.

mod command;
mod config;
mod process;
mod workspace;

use async_trait::async_trait;
pub use command::CommandDeployer;
pub use config::DeployerConfig;
pub use process::ProcessDeployer;
use tokio::process::Child;

use crate::{MachineSpec, Result};

/// Starts the external deploy process for a machine.
#[async_trait]
pub trait Deployer: Send + Sync + 'static {
    /// Prepares whatever the process needs and spawns it.
    ///
    /// The returned child must have piped standard output and standard
    /// error. It is owned by the job from then on.
    async fn spawn(&self, spec: &MachineSpec) -> Result<Child>;
}
