//! Exclusive handle on a job's output sequence.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

use super::{JobEvent, JobId, JobManager};
use crate::TRACING_TARGET_JOBS;

/// Single-pass output sequence of one job.
///
/// Yields tagged output lines followed by exactly one
/// [`JobEvent::Exited`]. The job is reaped as soon as the exit event has
/// been yielded. Dropping the stream earlier hands the remaining output to
/// a background task that drains it and then reaps the job.
pub struct JobStream {
    id: JobId,
    receiver: Option<UnboundedReceiver<JobEvent>>,
    manager: JobManager,
}

impl std::fmt::Debug for JobStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobStream")
            .field("id", &self.id)
            .field("finished", &self.receiver.is_none())
            .finish_non_exhaustive()
    }
}

impl JobStream {
    pub(super) fn new(id: JobId, receiver: UnboundedReceiver<JobEvent>, manager: JobManager) -> Self {
        Self {
            id,
            receiver: Some(receiver),
            manager,
        }
    }

    /// Returns the identifier of the job.
    pub fn id(&self) -> JobId {
        self.id
    }

    fn finish(&mut self) {
        self.receiver = None;
        self.manager.reap(self.id);
    }
}

impl Stream for JobStream {
    type Item = JobEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(receiver) = this.receiver.as_mut() else {
            return Poll::Ready(None);
        };

        match receiver.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_exit() {
                    this.finish();
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for JobStream {
    fn drop(&mut self) {
        let Some(receiver) = self.receiver.take() else {
            return;
        };

        match Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(
                    target: TRACING_TARGET_JOBS,
                    job_id = %self.id,
                    "consumer detached, draining in background"
                );
                handle.spawn(drain(self.id, receiver, self.manager.clone()));
            }
            Err(_) => self.manager.restore(self.id, receiver),
        }
    }
}

async fn drain(id: JobId, mut receiver: UnboundedReceiver<JobEvent>, manager: JobManager) {
    let mut discarded = 0usize;
    while let Some(event) = receiver.recv().await {
        if event.is_exit() {
            break;
        }
        discarded += 1;
    }

    tracing::debug!(
        target: TRACING_TARGET_JOBS,
        job_id = %id,
        discarded,
        "background drain finished"
    );
    manager.reap(id);
}
