//! Extension map handlers.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::routing::get;
use machinist_core::ExtensionMap;

use crate::extract::Json;
use crate::handler::Result;
use crate::handler::response::ExtensionSummary;
use crate::service::ServiceState;

/// Tracing target for extension map operations.
const TRACING_TARGET: &str = "machinist_server::handler::extensions";

/// Summarizes the loaded extension map.
#[tracing::instrument(skip_all)]
async fn extension_summary(
    State(extensions): State<Arc<ExtensionMap>>,
) -> Result<Json<ExtensionSummary>> {
    let summary = ExtensionSummary::from(extensions.as_ref());

    tracing::debug!(
        target: TRACING_TARGET,
        source = %summary.source,
        extensions = summary.extension_count,
        "extension map summary requested"
    );

    Ok(Json(summary))
}

/// Returns a [`Router`] with all extension map routes.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/extensions", get(extension_summary))
}
