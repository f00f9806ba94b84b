//! Workflow dependency resolution handlers.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::routing::post;
use machinist_core::{ExtensionMap, NodeResolver, ResolutionResult, WorkflowGraph};
use serde_json::Value;

use crate::extract::Json;
use crate::handler::Result;
use crate::service::ServiceState;

/// Tracing target for workflow operations.
const TRACING_TARGET: &str = "machinist_server::handler::workflows";

/// Resolves the custom node packages a workflow document depends on.
///
/// Accepts both the UI export format and the API format. Sections with an
/// unexpected shape are treated as empty instead of rejected.
#[tracing::instrument(skip_all)]
async fn resolve_dependencies(
    State(extensions): State<Arc<ExtensionMap>>,
    Json(document): Json<Value>,
) -> Result<Json<ResolutionResult>> {
    let workflow = WorkflowGraph::from_value(&document);
    let result = NodeResolver::new(&extensions).resolve(&workflow);

    tracing::info!(
        target: TRACING_TARGET,
        custom_nodes = result.custom_nodes.len(),
        unknown_nodes = result.unknown_nodes.len(),
        "workflow dependencies resolved"
    );

    Ok(Json(result))
}

/// Returns a [`Router`] with all workflow related routes.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/workflows/dependencies", post(resolve_dependencies))
}
