//! Deployment job response types.

use jiff::Timestamp;
use machinist_runtime::{JobId, JobState, JobSummary};
use serde::{Deserialize, Serialize};

/// Response to a submitted deployment.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineCreated {
    /// Identifier to attach to the deployment output with.
    pub machine_id: JobId,
}

/// A tracked deployment job.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    /// Job identifier.
    pub machine_id: JobId,
    /// Machine being deployed.
    pub machine_name: String,
    /// Lifecycle state.
    pub state: JobState,
    /// Whether someone is streaming the output right now.
    pub attached: bool,
    /// When the deployment was submitted.
    pub created_at: Timestamp,
}

impl From<JobSummary> for Machine {
    fn from(summary: JobSummary) -> Self {
        Self {
            machine_id: summary.id,
            machine_name: summary.machine_name,
            state: summary.state,
            attached: summary.attached,
            created_at: summary.created_at,
        }
    }
}

/// List of tracked deployment jobs.
#[must_use]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machines {
    /// Jobs, oldest first.
    pub machines: Vec<Machine>,
}

impl FromIterator<JobSummary> for Machines {
    fn from_iter<I: IntoIterator<Item = JobSummary>>(iter: I) -> Self {
        Self {
            machines: iter.into_iter().map(Machine::from).collect(),
        }
    }
}

/// Payload of the terminal `exit` event of a log stream.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStatus {
    /// Exit code, `null` if the process was killed by a signal.
    pub code: Option<i32>,
}
