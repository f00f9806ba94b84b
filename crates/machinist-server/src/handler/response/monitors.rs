//! Monitor response types.

use jiff::Timestamp;
use machinist_core::ExtensionSource;
use serde::{Deserialize, Serialize};

/// System monitoring status response.
#[must_use]
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    /// Timestamp when this status was generated.
    pub checked_at: Timestamp,
    /// Application version.
    pub version: String,
    /// Where the extension map was loaded from.
    pub extension_source: ExtensionSource,
    /// Number of extension entries.
    pub extensions: usize,
    /// Number of tracked deployment jobs.
    pub jobs: usize,
}
