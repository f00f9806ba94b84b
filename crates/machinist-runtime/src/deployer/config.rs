//! Deployer configuration.

use std::path::PathBuf;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default values for configuration options.
mod defaults {
    /// Directory holding the machine template.
    pub const TEMPLATE_DIR: &str = "./template";
    /// Directory where machine workspaces are created.
    pub const BUILDS_DIR: &str = "./builds";
    /// Platform CLI program.
    pub const PROGRAM: &str = "modal";
    /// Platform CLI arguments.
    pub const ARGS: &str = "deploy app.py";
    /// Container idle timeout in seconds.
    pub const IDLE_TIMEOUT: u64 = 300;
}

/// Configuration for [`ProcessDeployer`].
///
/// [`ProcessDeployer`]: crate::ProcessDeployer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct DeployerConfig {
    /// Directory copied into every machine workspace.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "TEMPLATE_DIR", default_value = defaults::TEMPLATE_DIR)
    )]
    pub template_dir: PathBuf,

    /// Directory under which `<machine name>` workspaces are created.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "BUILDS_DIR", default_value = defaults::BUILDS_DIR)
    )]
    pub builds_dir: PathBuf,

    /// Platform CLI program run inside the workspace.
    #[cfg_attr(
        feature = "config",
        arg(long = "deploy-program", env = "DEPLOY_PROGRAM", default_value = defaults::PROGRAM)
    )]
    pub program: String,

    /// Whitespace-separated arguments passed to the program.
    #[cfg_attr(
        feature = "config",
        arg(long = "deploy-args", env = "DEPLOY_ARGS", default_value = defaults::ARGS)
    )]
    pub args: String,

    /// Container idle timeout in seconds, written to the machine config.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "IDLE_TIMEOUT", default_value_t = defaults::IDLE_TIMEOUT)
    )]
    pub idle_timeout: u64,
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            template_dir: defaults::TEMPLATE_DIR.into(),
            builds_dir: defaults::BUILDS_DIR.into(),
            program: defaults::PROGRAM.to_owned(),
            args: defaults::ARGS.to_owned(),
            idle_timeout: defaults::IDLE_TIMEOUT,
        }
    }
}

impl DeployerConfig {
    /// Sets the template and builds directories.
    pub fn with_dirs(mut self, template_dir: impl Into<PathBuf>, builds_dir: impl Into<PathBuf>) -> Self {
        self.template_dir = template_dir.into();
        self.builds_dir = builds_dir.into();
        self
    }

    /// Sets the program and its arguments.
    pub fn with_command(mut self, program: impl Into<String>, args: impl Into<String>) -> Self {
        self.program = program.into();
        self.args = args.into();
        self
    }

    /// Returns the program arguments.
    pub fn args(&self) -> impl Iterator<Item = &str> {
        self.args.split_whitespace()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.program.trim().is_empty() {
            return Err("deploy program cannot be empty".to_owned());
        }
        if self.template_dir == self.builds_dir {
            return Err("template and builds directories must differ".to_owned());
        }
        if self.idle_timeout == 0 {
            return Err("idle timeout must be greater than 0".to_owned());
        }
        Ok(())
    }
}
