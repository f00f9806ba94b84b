//! Deployment jobs and the registry that tracks them.
//!
//! A job owns one deploy process. A worker task reads both output pipes
//! line by line, tags each line with its channel and forwards everything
//! into one unbounded channel, then appends the exit code. The registry
//! holds the receiving end until a caller attaches.
//!
//! ```text
//! running ──(process exits)──▶ draining ──(last event consumed)──▶ reaped
//! ```

mod event;
mod manager;
mod stream;
mod worker;

pub use event::{JobEvent, JobState, JobSummary, OutputChannel, OutputLine};
pub use manager::{Attach, JobManager};
pub use stream::JobStream;

/// Identifier of a tracked job.
pub type JobId = uuid::Uuid;
