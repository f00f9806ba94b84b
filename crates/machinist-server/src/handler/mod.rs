//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use machinist_server::handler::routes;
//! use machinist_server::middleware::RecoveryConfig;
//! use machinist_server::service::{ServiceConfig, ServiceState};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServiceConfig::default();
//! let state = ServiceState::from_config(&config).await?;
//!
//! let router: axum::Router = routes(&RecoveryConfig::default()).with_state(state);
//! # Ok(())
//! # }
//! ```
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod error;
mod extensions;
mod machines;
mod monitors;
pub mod request;
pub mod response;
mod workflows;

use axum::Router;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
use crate::middleware::{RecoveryConfig, RouterRecoveryExt};
use crate::service::ServiceState;

#[inline]
async fn handler() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns a [`Router`] with all request/response routes.
fn api_routes() -> Router<ServiceState> {
    Router::new()
        .merge(workflows::routes())
        .merge(extensions::routes())
        .merge(machines::routes())
        .merge(monitors::routes())
}

/// Returns a [`Router`] with all routes.
///
/// The request timeout applies to every route except the log streams, which
/// stay open for as long as the deploy process runs.
pub fn routes(recovery: &RecoveryConfig) -> Router<ServiceState> {
    let api_router = api_routes().with_recovery(recovery);
    let streaming_router = machines::streaming_routes().with_panic_recovery();

    api_router.merge(streaming_router).fallback(handler)
}

#[cfg(test)]
pub(crate) mod test {
    use axum::Router;
    use axum_test::TestServer;
    use machinist_core::{CORE_EXTENSION_ID, ExtensionEntry, ExtensionMap};
    use machinist_runtime::{CommandDeployer, JobManager};

    use crate::handler::routes;
    use crate::middleware::RecoveryConfig;
    use crate::service::ServiceState;

    /// Returns a small extension map covering every match kind.
    pub fn test_extension_map() -> ExtensionMap {
        ExtensionMap::new()
            .with_core_id(CORE_EXTENSION_ID)
            .with_entry(
                CORE_EXTENSION_ID,
                ExtensionEntry::new(["KSampler", "CheckpointLoaderSimple"]),
            )
            .with_entry(
                "https://github.com/cubiq/ComfyUI_IPAdapter_plus",
                ExtensionEntry::new(["IPAdapterApply"]),
            )
            .with_entry(
                "https://github.com/example/clone",
                ExtensionEntry::new(["IPAdapterApply"]),
            )
            .with_entry(
                "https://github.com/example/upscale",
                ExtensionEntry::new(["UltimateSDUpscale"]),
            )
            .with_entry(
                "https://github.com/example/video",
                ExtensionEntry::new(Vec::<String>::new()).with_pattern("^VHS_"),
            )
    }

    /// Returns a state whose deployments run the given shell script.
    pub fn test_state(script: &str) -> ServiceState {
        let jobs = JobManager::new(CommandDeployer::new(script));
        ServiceState::new(test_extension_map(), jobs)
    }

    /// Returns a new [`TestServer`] with the given router.
    pub async fn create_test_server_with_router(
        router: impl Fn(ServiceState) -> Router<ServiceState>,
    ) -> anyhow::Result<TestServer> {
        let state = test_state("true");
        let router = router(state.clone());
        create_test_server_with_state(router, state).await
    }

    /// Returns a new [`TestServer`] with the given router and state.
    pub async fn create_test_server_with_state(
        router: Router<ServiceState>,
        state: ServiceState,
    ) -> anyhow::Result<TestServer> {
        let app = router.with_state(state);
        let server = TestServer::new(app)?;
        Ok(server)
    }

    /// Returns a new [`TestServer`] with the default router and state.
    pub async fn create_test_server() -> anyhow::Result<TestServer> {
        let state = test_state("true");
        let router = routes(&RecoveryConfig::default());
        create_test_server_with_state(router, state).await
    }

    #[tokio::test]
    async fn handlers() -> anyhow::Result<()> {
        let server = create_test_server().await?;
        server.get("/health").await.assert_status_ok();
        Ok(())
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() -> anyhow::Result<()> {
        let server = create_test_server().await?;

        let response = server.get("/nope").await;
        response.assert_status_not_found();
        assert_eq!(response.json::<serde_json::Value>()["name"], "not_found");
        Ok(())
    }

    #[tokio::test]
    async fn log_streams_outlive_request_timeout() -> anyhow::Result<()> {
        let state = test_state("sleep 2; echo finished");
        let router = routes(&RecoveryConfig::with_timeout_secs(1));
        let server = create_test_server_with_state(router, state).await?;

        let response = server
            .post("/machines")
            .json(&serde_json::json!({ "machineName": "slow" }))
            .await;
        let machine_id = response.json::<serde_json::Value>()["machineId"]
            .as_str()
            .unwrap_or_default()
            .to_owned();

        let response = server.get(&format!("/machines/{machine_id}/logs")).await;
        response.assert_status_ok();
        assert!(response.text().contains("data: finished"));
        Ok(())
    }
}
