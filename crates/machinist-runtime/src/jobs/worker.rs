//! Per-job worker task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc::UnboundedSender;

use super::{JobEvent, JobId, OutputChannel};
use crate::TRACING_TARGET_JOBS;

/// Forwards both pipes, waits for the process and emits the exit event.
pub(super) async fn run<O, E>(
    id: JobId,
    mut child: Child,
    stdout: O,
    stderr: E,
    events: UnboundedSender<JobEvent>,
    exited: Arc<AtomicBool>,
) where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    tokio::join!(
        forward(id, stdout, OutputChannel::Stdout, &events),
        forward(id, stderr, OutputChannel::Stderr, &events),
    );

    let code = match child.wait().await {
        Ok(status) => status.code(),
        Err(error) => {
            tracing::warn!(
                target: TRACING_TARGET_JOBS,
                job_id = %id,
                error = %error,
                "failed to collect deploy process status"
            );
            None
        }
    };

    exited.store(true, Ordering::Release);

    tracing::info!(
        target: TRACING_TARGET_JOBS,
        job_id = %id,
        exit_code = ?code,
        "deploy process exited"
    );

    // The receiver lives in the registry until the job is reaped.
    let _ = events.send(JobEvent::Exited { code });
}

/// Reads a pipe to its end, one event per line.
async fn forward<R>(id: JobId, reader: R, channel: OutputChannel, events: &UnboundedSender<JobEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(reader).split(b'\n');
    let mut count = 0usize;

    loop {
        match segments.next_segment().await {
            Ok(Some(mut segment)) => {
                if segment.last() == Some(&b'\r') {
                    segment.pop();
                }
                let line = String::from_utf8_lossy(&segment).into_owned();
                count += 1;
                // Keep reading after a failed send so the process never
                // blocks on a full pipe.
                let _ = events.send(JobEvent::line(channel, line));
            }
            Ok(None) => break,
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_JOBS,
                    job_id = %id,
                    channel = %channel,
                    error = %error,
                    "failed to read deploy process output"
                );
                break;
            }
        }
    }

    tracing::debug!(
        target: TRACING_TARGET_JOBS,
        job_id = %id,
        channel = %channel,
        lines = count,
        "output channel closed"
    );
}
