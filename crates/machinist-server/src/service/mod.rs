//! Application state and dependency injection.

mod config;

use std::sync::Arc;

use machinist_core::ExtensionMap;
use machinist_runtime::JobManager;

pub use crate::service::config::ServiceConfig;
// Re-export error types from crate root for convenience
pub use crate::{Error, Result};

/// Tracing target for service state initialization.
pub(crate) const TRACING_TARGET: &str = "machinist_server::service";

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Debug, Clone)]
pub struct ServiceState {
    // Read-only after load:
    pub extensions: Arc<ExtensionMap>,

    // Shared registry of deployment jobs:
    pub jobs: JobManager,
}

impl ServiceState {
    /// Creates application state from already constructed services.
    pub fn new(extensions: ExtensionMap, jobs: JobManager) -> Self {
        Self {
            extensions: Arc::new(extensions),
            jobs,
        }
    }

    /// Initializes application state from configuration.
    ///
    /// Loads the extension map (falling back to the bundled snapshot) and
    /// sets up the process deployer.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        let deployer = config.create_deployer().await?;
        let extensions = config.load_extension_map().await?;

        tracing::info!(
            target: TRACING_TARGET,
            extensions = extensions.len(),
            source = %extensions.source(),
            "service state initialized"
        );

        Ok(Self::new(extensions, JobManager::new(deployer)))
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(extensions: Arc<ExtensionMap>);
impl_di!(jobs: JobManager);
