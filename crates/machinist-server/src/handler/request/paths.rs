//! Path parameter types for HTTP handlers.

use machinist_runtime::JobId;
use serde::{Deserialize, Serialize};

/// Path parameters for deployment job operations.
#[must_use]
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachinePathParams {
    /// Identifier returned when the deployment was submitted.
    pub machine_id: JobId,
}
