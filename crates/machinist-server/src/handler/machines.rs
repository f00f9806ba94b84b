//! Machine deployment handlers.
//!
//! Submitting a machine starts the deploy process and returns at once with
//! a `machineId`. The process output is streamed as Server-Sent Events from
//! `/machines/{machineId}/logs`: one `stdout` or `stderr` event per line,
//! then a single `exit` event carrying the exit code. Only one client can
//! stream a job at a time, and a job is forgotten once its output has been
//! fully consumed.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use machinist_runtime::{Attach, JobEvent, JobManager, OutputLine};
use tokio_stream::{Stream, StreamExt};

use crate::extract::{Json, Path, ValidateJson};
use crate::handler::request::{CreateMachine, MachinePathParams};
use crate::handler::response::{ExitStatus, MachineCreated, Machines};
use crate::handler::{ErrorKind, Result};
use crate::service::ServiceState;

/// Tracing target for machine operations.
const TRACING_TARGET: &str = "machinist_server::handler::machines";

/// Starts a deployment.
#[tracing::instrument(skip_all)]
async fn create_machine(
    State(jobs): State<JobManager>,
    ValidateJson(request): ValidateJson<CreateMachine>,
) -> Result<(StatusCode, Json<MachineCreated>)> {
    let spec = request.into_spec();
    let machine_id = jobs.submit(&spec).await?;

    tracing::info!(
        target: TRACING_TARGET,
        machine_id = %machine_id,
        machine_name = %spec.machine_name,
        gpu = %spec.gpu,
        custom_nodes = spec.custom_nodes.custom_nodes.len(),
        models = spec.models.len(),
        "deployment submitted"
    );

    Ok((StatusCode::ACCEPTED, Json(MachineCreated { machine_id })))
}

/// Lists tracked deployments, oldest first.
#[tracing::instrument(skip_all)]
async fn list_machines(State(jobs): State<JobManager>) -> Result<Json<Machines>> {
    Ok(Json(jobs.list().into_iter().collect()))
}

/// Streams the output of a deployment.
#[tracing::instrument(skip_all)]
async fn stream_logs(
    State(jobs): State<JobManager>,
    Path(path): Path<MachinePathParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let stream = match jobs.attach(path.machine_id) {
        Attach::Attached(stream) => stream,
        Attach::NotFound => {
            return Err(ErrorKind::NotFound
                .with_message("Deployment job not found")
                .with_resource("machine")
                .with_context(format!("no job is tracked under {}", path.machine_id)));
        }
        Attach::Busy => {
            return Err(ErrorKind::Conflict
                .with_message("Deployment output is already being streamed")
                .with_resource("machine")
                .with_context(format!("job {} has another reader", path.machine_id)));
        }
    };

    tracing::info!(
        target: TRACING_TARGET,
        machine_id = %path.machine_id,
        "streaming deployment output"
    );

    let events = stream.map(into_event);
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Renders one job event as a Server-Sent Event.
fn into_event(event: JobEvent) -> Result<Event, axum::Error> {
    match event {
        JobEvent::Line(OutputLine { channel, line }) => {
            let name: &'static str = channel.into();
            Ok(Event::default().event(name).data(line))
        }
        JobEvent::Exited { code } => Event::default()
            .event("exit")
            .json_data(ExitStatus { code }),
    }
}

/// Returns a [`Router`] with the request/response machine routes.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/machines", post(create_machine).get(list_machines))
}

/// Returns a [`Router`] with the long-lived log streaming routes.
pub fn streaming_routes() -> Router<ServiceState> {
    Router::new().route("/machines/{machineId}/logs", get(stream_logs))
}
