//! Runtime error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for runtime operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while starting a deployment.
#[derive(Debug, Error)]
pub enum Error {
    /// Preparing the machine workspace failed.
    #[error("workspace error at {}: {source}", path.display())]
    Workspace {
        /// Path that could not be read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The deploy process could not be started.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The deploy process was spawned without a piped output channel.
    #[error("deploy process has no piped {0}")]
    MissingPipe(&'static str),

    /// A job for this machine is still running in its workspace.
    #[error("machine `{machine_name}` already has a running deployment")]
    MachineRunning {
        /// Name of the machine.
        machine_name: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Creates a workspace error for the given path.
    pub fn workspace(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Workspace {
            path: path.into(),
            source,
        }
    }

    /// Creates an error for a machine whose deployment is still running.
    pub fn machine_running(machine_name: impl Into<String>) -> Self {
        Self::MachineRunning {
            machine_name: machine_name.into(),
        }
    }

    /// Creates a spawn error for the given program.
    pub fn spawn(program: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }
}
