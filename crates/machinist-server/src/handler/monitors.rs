//! Health check handlers.

use axum::Router;
use axum::extract::State;
use axum::routing::get;
use jiff::Timestamp;

use crate::extract::Json;
use crate::handler::Result;
use crate::handler::response::MonitorStatus;
use crate::service::ServiceState;

/// Tracing target for monitor operations.
const TRACING_TARGET: &str = "machinist_server::handler::monitors";

/// Reports liveness together with a few counters.
#[tracing::instrument(skip_all)]
async fn health_status(State(state): State<ServiceState>) -> Result<Json<MonitorStatus>> {
    let response = MonitorStatus {
        checked_at: Timestamp::now(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        extension_source: state.extensions.source(),
        extensions: state.extensions.len(),
        jobs: state.jobs.len(),
    };

    tracing::debug!(
        target: TRACING_TARGET,
        extensions = response.extensions,
        jobs = response.jobs,
        "health status checked"
    );

    Ok(Json(response))
}

/// Returns a [`Router`] with all health monitoring routes.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/health", get(health_status))
}

#[cfg(test)]
mod tests {
    use machinist_core::ExtensionSource;

    use super::*;
    use crate::handler::test::create_test_server_with_router;

    #[tokio::test]
    async fn health_status_reports_counters() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let response = server.get("/health").await;
        response.assert_status_ok();

        let status = response.json::<MonitorStatus>();
        assert_eq!(status.extension_source, ExtensionSource::Memory);
        assert_eq!(status.extensions, 5);
        assert_eq!(status.jobs, 0);
        assert_eq!(status.version, env!("CARGO_PKG_VERSION"));

        let age = Timestamp::now().duration_since(status.checked_at);
        assert!(age.as_secs() < 60, "timestamp should be recent");
        Ok(())
    }
}
