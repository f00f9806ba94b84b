//! Job output events and summaries.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, IntoStaticStr};

use super::JobId;

/// Output pipe a line was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutputChannel {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// One line of process output, without its line terminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    /// Pipe the line came from.
    pub channel: OutputChannel,
    /// Line content, lossily decoded as UTF-8.
    pub line: String,
}

/// Item of a job's output sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// A line of output.
    Line(OutputLine),
    /// The process exited. Always the last event.
    Exited {
        /// Exit code, `None` if the process was killed by a signal.
        code: Option<i32>,
    },
}

impl JobEvent {
    /// Creates a line event.
    pub fn line(channel: OutputChannel, line: impl Into<String>) -> Self {
        Self::Line(OutputLine {
            channel,
            line: line.into(),
        })
    }

    /// Returns true for the terminal event.
    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exited { .. })
    }
}

/// Lifecycle state of a tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobState {
    /// Process alive, output may still arrive.
    Running,
    /// Process exited, buffered output not yet consumed.
    Draining,
    /// Removed from the registry.
    Reaped,
}

/// Snapshot of a tracked job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    /// Job identifier.
    pub id: JobId,
    /// Machine being deployed.
    pub machine_name: String,
    /// Lifecycle state.
    pub state: JobState,
    /// Whether the output stream is checked out.
    pub attached: bool,
    /// When the job was submitted.
    pub created_at: Timestamp,
}
