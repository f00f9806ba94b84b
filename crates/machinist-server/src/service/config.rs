//! Service configuration.

#[cfg(feature = "config")]
use clap::Args;
use machinist_core::ExtensionMap;
use machinist_reqwest::{ExtensionMapClient, ExtensionMapConfig};
use machinist_runtime::{DeployerConfig, ProcessDeployer};
use serde::{Deserialize, Serialize};

use super::TRACING_TARGET;
use crate::{Error, Result};

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// Where the extension map is loaded from.
    #[cfg_attr(feature = "config", command(flatten))]
    pub extension_map: ExtensionMapConfig,

    /// How machine workspaces are prepared and deployed.
    #[cfg_attr(feature = "config", command(flatten))]
    pub deployer: DeployerConfig,
}

impl ServiceConfig {
    /// Sets the extension map configuration.
    pub fn with_extension_map(mut self, extension_map: ExtensionMapConfig) -> Self {
        self.extension_map = extension_map;
        self
    }

    /// Sets the deployer configuration.
    pub fn with_deployer(mut self, deployer: DeployerConfig) -> Self {
        self.deployer = deployer;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.extension_map.url.trim().is_empty() && !self.extension_map.offline {
            return Err(Error::config("extension map URL cannot be empty"));
        }

        self.deployer.validate().map_err(Error::config)
    }

    /// Loads the extension map.
    ///
    /// Never fails on fetch errors; those fall back to the bundled snapshot.
    pub async fn load_extension_map(&self) -> Result<ExtensionMap> {
        let client = ExtensionMapClient::new(self.extension_map.clone())?;
        Ok(client.load().await)
    }

    /// Creates the deployer that runs the platform CLI.
    pub async fn create_deployer(&self) -> Result<ProcessDeployer> {
        self.validate()?;

        let template_dir = &self.deployer.template_dir;
        let exists = tokio::fs::try_exists(template_dir).await.map_err(|e| {
            Error::file_system(format!(
                "cannot access template directory {}",
                template_dir.display()
            ))
            .with_source(e)
        })?;

        if !exists {
            tracing::warn!(
                target: TRACING_TARGET,
                template_dir = %template_dir.display(),
                "template directory does not exist, deployments will fail"
            );
        }

        Ok(ProcessDeployer::new(self.deployer.clone()))
    }
}
