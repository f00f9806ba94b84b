//! Runtime error to HTTP error conversion.

use super::http_error::{Error as HttpError, ErrorKind};

/// Tracing target for runtime error conversions.
const TRACING_TARGET: &str = "machinist_server::handler::runtime";

impl From<machinist_runtime::Error> for HttpError<'static> {
    fn from(error: machinist_runtime::Error) -> Self {
        use machinist_runtime::Error as RuntimeError;

        if let RuntimeError::MachineRunning { machine_name } = &error {
            tracing::warn!(
                target: TRACING_TARGET,
                machine_name = %machine_name,
                "deployment rejected, machine is still deploying"
            );
        } else {
            tracing::error!(
                target: TRACING_TARGET,
                error = %error,
                "deployment could not be started"
            );
        }

        match error {
            RuntimeError::MachineRunning { .. } => ErrorKind::Conflict
                .with_message("Machine already has a running deployment")
                .with_resource("machine")
                .with_context(error.to_string()),
            RuntimeError::Workspace { .. } => ErrorKind::InternalServerError
                .with_message("Failed to prepare the machine workspace")
                .with_resource("machine")
                .with_context(error.to_string()),
            RuntimeError::Spawn { .. } | RuntimeError::MissingPipe(_) => {
                ErrorKind::InternalServerError
                    .with_message("Failed to start the deploy process")
                    .with_resource("machine")
                    .with_context(error.to_string())
            }
            RuntimeError::Serialization(_) => ErrorKind::InternalServerError
                .with_message("Failed to write the machine configuration")
                .with_resource("machine")
                .with_context(error.to_string()),
        }
    }
}
