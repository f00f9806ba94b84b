//! Job registry.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use jiff::Timestamp;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use super::{JobEvent, JobId, JobState, JobStream, JobSummary, worker};
use crate::{Deployer, Error, MachineSpec, Result, TRACING_TARGET_JOBS};

/// Outcome of [`JobManager::attach`].
#[derive(Debug)]
pub enum Attach {
    /// The output stream of the job, checked out exclusively.
    Attached(JobStream),
    /// No job is tracked under the identifier, either because it never
    /// existed or because it was already drained.
    NotFound,
    /// Another consumer holds the output stream.
    Busy,
}

/// Registry record of one job.
struct JobEntry {
    machine_name: String,
    created_at: Timestamp,
    exited: Arc<AtomicBool>,
    receiver: Option<UnboundedReceiver<JobEvent>>,
}

impl JobEntry {
    fn summary(&self, id: JobId) -> JobSummary {
        JobSummary {
            id,
            machine_name: self.machine_name.clone(),
            state: self.state(),
            attached: self.receiver.is_none(),
            created_at: self.created_at,
        }
    }

    fn state(&self) -> JobState {
        if self.exited.load(Ordering::Acquire) {
            JobState::Draining
        } else {
            JobState::Running
        }
    }
}

struct JobManagerInner {
    deployer: Arc<dyn Deployer>,
    jobs: Mutex<HashMap<JobId, JobEntry>>,
    // Machine names whose workspace is being prepared or spawned.
    starting: Mutex<HashSet<String>>,
}

/// Exclusive claim on a machine name while its job is being started.
struct NameReservation<'a> {
    starting: &'a Mutex<HashSet<String>>,
    machine_name: String,
}

impl Drop for NameReservation<'_> {
    fn drop(&mut self) {
        self.starting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.machine_name);
    }
}

/// Tracks in-flight deployment jobs by identifier.
///
/// Cloning is cheap; clones share the same registry. The registry lock is
/// held only for insert, lookup and removal.
#[derive(Clone)]
pub struct JobManager {
    inner: Arc<JobManagerInner>,
}

impl std::fmt::Debug for JobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobManager")
            .field("jobs", &self.len())
            .finish_non_exhaustive()
    }
}

impl JobManager {
    /// Creates a job manager that starts jobs with the given deployer.
    pub fn new(deployer: impl Deployer) -> Self {
        Self::from_deployer(Arc::new(deployer))
    }

    /// Creates a job manager from a shared deployer.
    pub fn from_deployer(deployer: Arc<dyn Deployer>) -> Self {
        let inner = JobManagerInner {
            deployer,
            jobs: Mutex::new(HashMap::new()),
            starting: Mutex::new(HashSet::new()),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<JobId, JobEntry>> {
        self.inner
            .jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims `machine_name` until the returned reservation is dropped.
    ///
    /// Fails while another job for the same machine is starting or its
    /// process is still running, since both share one workspace directory.
    fn reserve(&self, machine_name: &str) -> Result<NameReservation<'_>> {
        let starting = &self.inner.starting;
        let inserted = starting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(machine_name.to_owned());

        if !inserted {
            return Err(Error::machine_running(machine_name));
        }

        let reservation = NameReservation {
            starting,
            machine_name: machine_name.to_owned(),
        };

        let running = self.jobs().values().any(|entry| {
            entry.machine_name == machine_name && entry.state() == JobState::Running
        });

        if running {
            return Err(Error::machine_running(machine_name));
        }

        Ok(reservation)
    }

    /// Starts a deployment and registers it under a fresh identifier.
    ///
    /// Returns as soon as the process is spawned. Nothing is registered if
    /// the workspace cannot be prepared or the process cannot be started,
    /// or if a job for the same machine name is still running.
    pub async fn submit(&self, spec: &MachineSpec) -> Result<JobId> {
        let _reservation = self.reserve(&spec.machine_name)?;
        let mut child = self.inner.deployer.spawn(spec).await?;
        let stdout = child.stdout.take().ok_or(Error::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(Error::MissingPipe("stderr"))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let exited = Arc::new(AtomicBool::new(false));

        let entry = JobEntry {
            machine_name: spec.machine_name.clone(),
            created_at: Timestamp::now(),
            exited: exited.clone(),
            receiver: Some(receiver),
        };

        let id = {
            let mut jobs = self.jobs();
            let id = loop {
                let id = JobId::now_v7();
                if !jobs.contains_key(&id) {
                    break id;
                }
            };
            jobs.insert(id, entry);
            id
        };

        tracing::info!(
            target: TRACING_TARGET_JOBS,
            job_id = %id,
            machine_name = %spec.machine_name,
            pid = ?child.id(),
            "deployment job started"
        );

        tokio::spawn(worker::run(id, child, stdout, stderr, sender, exited));
        Ok(id)
    }

    /// Checks out the output stream of a job.
    pub fn attach(&self, id: JobId) -> Attach {
        let mut jobs = self.jobs();
        let Some(entry) = jobs.get_mut(&id) else {
            return Attach::NotFound;
        };

        match entry.receiver.take() {
            Some(receiver) => {
                tracing::debug!(target: TRACING_TARGET_JOBS, job_id = %id, "job attached");
                Attach::Attached(JobStream::new(id, receiver, self.clone()))
            }
            None => Attach::Busy,
        }
    }

    /// Lists tracked jobs, oldest first.
    pub fn list(&self) -> Vec<JobSummary> {
        let mut summaries: Vec<_> = self
            .jobs()
            .iter()
            .map(|(id, entry)| entry.summary(*id))
            .collect();
        summaries.sort_by_key(|summary| summary.id);
        summaries
    }

    /// Returns the lifecycle state of a job.
    pub fn state(&self, id: JobId) -> JobState {
        self.jobs()
            .get(&id)
            .map(JobEntry::state)
            .unwrap_or(JobState::Reaped)
    }

    /// Returns the number of tracked jobs.
    pub fn len(&self) -> usize {
        self.jobs().len()
    }

    /// Returns true if no job is tracked.
    pub fn is_empty(&self) -> bool {
        self.jobs().is_empty()
    }

    /// Removes a fully drained job.
    pub(super) fn reap(&self, id: JobId) {
        if self.jobs().remove(&id).is_some() {
            tracing::debug!(target: TRACING_TARGET_JOBS, job_id = %id, "job reaped");
        }
    }

    /// Hands an undrained receiver back to the registry.
    pub(super) fn restore(&self, id: JobId, receiver: UnboundedReceiver<JobEvent>) {
        if let Some(entry) = self.jobs().get_mut(&id) {
            entry.receiver = Some(receiver);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;

    use super::*;
    use crate::{CommandDeployer, Gpu, OutputChannel, OutputLine};

    fn spec() -> MachineSpec {
        MachineSpec::new("test-machine", Gpu::Any)
    }

    async fn collect(manager: &JobManager, id: JobId) -> Vec<JobEvent> {
        match manager.attach(id) {
            Attach::Attached(stream) => stream.collect().await,
            other => panic!("expected attached stream, got {other:?}"),
        }
    }

    fn lines(events: &[JobEvent], channel: OutputChannel) -> Vec<&str> {
        events
            .iter()
            .filter_map(|event| match event {
                JobEvent::Line(OutputLine { channel: c, line }) if *c == channel => {
                    Some(line.as_str())
                }
                _ => None,
            })
            .collect()
    }

    async fn wait_until_reaped(manager: &JobManager, id: JobId) -> anyhow::Result<()> {
        tokio::time::timeout(Duration::from_secs(10), async {
            while manager.state(id) != JobState::Reaped {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await?;
        Ok(())
    }

    #[tokio::test]
    async fn submit_then_attach_is_never_not_found() -> anyhow::Result<()> {
        let manager = JobManager::new(CommandDeployer::new("echo ready"));
        let id = manager.submit(&spec()).await?;
        assert!(matches!(manager.attach(id), Attach::Attached(_)));
        Ok(())
    }

    #[tokio::test]
    async fn stream_tags_channels_and_ends_with_exit_code() -> anyhow::Result<()> {
        let script = "echo one; echo warn >&2; echo two; echo \"$MACHINE_NAME\"; exit 3";
        let manager = JobManager::new(CommandDeployer::new(script));
        let id = manager.submit(&spec()).await?;

        let events = collect(&manager, id).await;
        assert_eq!(lines(&events, OutputChannel::Stdout), ["one", "two", "test-machine"]);
        assert_eq!(lines(&events, OutputChannel::Stderr), ["warn"]);
        assert_eq!(events.last(), Some(&JobEvent::Exited { code: Some(3) }));
        assert_eq!(events.iter().filter(|event| event.is_exit()).count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn drained_job_is_reaped() -> anyhow::Result<()> {
        let manager = JobManager::new(CommandDeployer::new("echo done"));
        let id = manager.submit(&spec()).await?;

        collect(&manager, id).await;
        assert!(matches!(manager.attach(id), Attach::NotFound));
        assert_eq!(manager.state(id), JobState::Reaped);
        assert!(manager.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let manager = JobManager::new(CommandDeployer::new("true"));
        assert!(matches!(manager.attach(JobId::now_v7()), Attach::NotFound));
    }

    #[tokio::test]
    async fn second_concurrent_attach_is_busy() -> anyhow::Result<()> {
        let manager = JobManager::new(CommandDeployer::new("sleep 1; echo late"));
        let id = manager.submit(&spec()).await?;

        let first = manager.attach(id);
        assert!(matches!(first, Attach::Attached(_)));
        assert!(matches!(manager.attach(id), Attach::Busy));
        assert!(manager.list()[0].attached);
        Ok(())
    }

    #[tokio::test]
    async fn finished_job_stays_attachable_until_drained() -> anyhow::Result<()> {
        let manager = JobManager::new(CommandDeployer::new("echo buffered"));
        let id = manager.submit(&spec()).await?;

        tokio::time::timeout(Duration::from_secs(10), async {
            while manager.state(id) != JobState::Draining {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await?;

        let events = collect(&manager, id).await;
        assert_eq!(lines(&events, OutputChannel::Stdout), ["buffered"]);
        Ok(())
    }

    #[tokio::test]
    async fn dropped_stream_drains_in_background() -> anyhow::Result<()> {
        let manager = JobManager::new(CommandDeployer::new("echo a; sleep 0.2; echo b"));
        let id = manager.submit(&spec()).await?;

        let Attach::Attached(mut stream) = manager.attach(id) else {
            anyhow::bail!("expected attached stream");
        };
        assert!(stream.next().await.is_some());
        drop(stream);

        wait_until_reaped(&manager, id).await?;
        assert!(matches!(manager.attach(id), Attach::NotFound));
        Ok(())
    }

    #[tokio::test]
    async fn list_reports_running_jobs() -> anyhow::Result<()> {
        let manager = JobManager::new(CommandDeployer::new("sleep 1"));
        let first = manager.submit(&MachineSpec::new("first", Gpu::T4)).await?;
        let second = manager.submit(&MachineSpec::new("second", Gpu::H100)).await?;
        assert_ne!(first, second);

        let summaries = manager.list();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, first);
        assert_eq!(summaries[0].machine_name, "first");
        assert_eq!(summaries[0].state, JobState::Running);
        assert!(!summaries[0].attached);
        assert_eq!(summaries[1].id, second);
        Ok(())
    }

    #[tokio::test]
    async fn running_machine_name_is_rejected() -> anyhow::Result<()> {
        let manager = JobManager::new(CommandDeployer::new("sleep 1; echo first"));
        let first = manager.submit(&spec()).await?;

        let error = manager.submit(&spec()).await.unwrap_err();
        assert!(matches!(error, Error::MachineRunning { ref machine_name } if machine_name == "test-machine"));
        assert_eq!(manager.len(), 1);

        // A different machine is unaffected.
        manager.submit(&MachineSpec::new("other", Gpu::Any)).await?;

        let events = collect(&manager, first).await;
        assert_eq!(lines(&events, OutputChannel::Stdout), ["first"]);
        assert_eq!(events.last(), Some(&JobEvent::Exited { code: Some(0) }));
        Ok(())
    }

    #[tokio::test]
    async fn running_workspace_is_not_replaced() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let template = root.path().join("template");
        tokio::fs::create_dir_all(&template).await?;
        tokio::fs::write(template.join("run.sh"), "sleep 1; cat config.json").await?;

        let config = crate::DeployerConfig::default()
            .with_dirs(&template, root.path().join("builds"))
            .with_command("sh", "run.sh");
        let manager = JobManager::new(crate::ProcessDeployer::new(config));

        let first = manager.submit(&spec()).await?;
        assert!(manager.submit(&spec()).await.is_err());

        let events = collect(&manager, first).await;
        assert!(lines(&events, OutputChannel::Stderr).is_empty());
        let stdout = lines(&events, OutputChannel::Stdout);
        assert!(stdout.iter().any(|line| line.contains("\"machine_name\": \"test-machine\"")));
        assert_eq!(events.last(), Some(&JobEvent::Exited { code: Some(0) }));
        Ok(())
    }

    #[tokio::test]
    async fn exited_machine_name_can_be_resubmitted() -> anyhow::Result<()> {
        let manager = JobManager::new(CommandDeployer::new("echo done"));
        let first = manager.submit(&spec()).await?;

        tokio::time::timeout(Duration::from_secs(10), async {
            while manager.state(first) != JobState::Draining {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await?;

        let second = manager.submit(&spec()).await?;
        assert_ne!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn failed_start_releases_machine_name() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let config = crate::DeployerConfig::default()
            .with_dirs(root.path().join("missing"), root.path().join("builds"));
        let manager = JobManager::new(crate::ProcessDeployer::new(config));

        let first = manager.submit(&spec()).await.unwrap_err();
        let second = manager.submit(&spec()).await.unwrap_err();
        assert!(matches!(first, Error::Workspace { .. }));
        assert!(matches!(second, Error::Workspace { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn spawn_failure_registers_nothing() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let config = crate::DeployerConfig::default()
            .with_dirs(root.path().join("missing"), root.path().join("builds"));
        let manager = JobManager::new(crate::ProcessDeployer::new(config));

        assert!(manager.submit(&spec()).await.is_err());
        assert!(manager.is_empty());
        Ok(())
    }
}
