//! Job runner: how an audit request gets executed.
//!
//! `Immediate` runs the audit on the caller's task. `Queued` hands it to a
//! single background worker through a bounded queue and waits for the reply.
//! The mode comes from configuration; nothing here probes for a queue at
//! runtime.

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domain::models::SeoReport;
use crate::error::{AppError, Result};
use crate::service::progress::ProgressSink;
use crate::service::report_assembler::ReportAssembler;

/// Finished jobs whose state stays queryable; older ones are forgotten.
pub const FINISHED_JOB_RETENTION: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerMode {
    #[default]
    Immediate,
    Queued,
}

impl FromStr for RunnerMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" => Ok(RunnerMode::Immediate),
            "queued" => Ok(RunnerMode::Queued),
            other => Err(format!("unknown runner mode: {other}")),
        }
    }
}

/// Job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
}

struct Job {
    id: Uuid,
    url: String,
    sink: Option<Arc<dyn ProgressSink>>,
    reply: oneshot::Sender<Result<SeoReport>>,
}

/// Handle to an enqueued audit.
pub struct JobTicket {
    pub id: Uuid,
    receiver: oneshot::Receiver<Result<SeoReport>>,
}

impl JobTicket {
    /// Wait for the worker to finish this job.
    pub async fn wait(self) -> Result<SeoReport> {
        let id = self.id;
        self.receiver
            .await
            .map_err(|_| AppError::JobRunner(format!("job {id} was dropped before completing")))?
    }
}

/// Bounded queue drained by one worker task.
pub struct QueuedRunner {
    tx: mpsc::Sender<Job>,
    states: Arc<DashMap<Uuid, JobState>>,
    worker: JoinHandle<()>,
}

impl QueuedRunner {
    /// Starts the worker; must be called inside a tokio runtime.
    pub fn spawn(assembler: Arc<ReportAssembler>, capacity: usize) -> Self {
        Self::spawn_with_retention(assembler, capacity, FINISHED_JOB_RETENTION)
    }

    /// Like `spawn`, keeping the state of at most `retention` finished jobs.
    pub fn spawn_with_retention(
        assembler: Arc<ReportAssembler>,
        capacity: usize,
        retention: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let states = Arc::new(DashMap::new());
        let worker = tokio::spawn(run_worker(assembler, rx, states.clone(), retention));

        log::info!("[RUNNER] Queued runner started (capacity {})", capacity.max(1));
        Self { tx, states, worker }
    }

    pub async fn enqueue(
        &self,
        url: &str,
        sink: Option<Arc<dyn ProgressSink>>,
    ) -> Result<JobTicket> {
        let id = Uuid::new_v4();
        let (reply, receiver) = oneshot::channel();
        self.states.insert(id, JobState::Queued);

        let job = Job {
            id,
            url: url.to_string(),
            sink,
            reply,
        };
        if self.tx.send(job).await.is_err() {
            self.states.remove(&id);
            return Err(AppError::JobRunner("worker is not running".to_string()));
        }

        log::debug!("[RUNNER] Enqueued job {} for {}", id, url);
        Ok(JobTicket { id, receiver })
    }

    pub fn job_state(&self, id: Uuid) -> Option<JobState> {
        self.states.get(&id).map(|state| *state)
    }

    /// Number of jobs whose state is still held.
    pub fn tracked_jobs(&self) -> usize {
        self.states.len()
    }

    /// Stop accepting work and wait for queued jobs to finish.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            log::error!("[RUNNER] Worker task failed: {}", e);
        }
    }
}

async fn run_worker(
    assembler: Arc<ReportAssembler>,
    mut rx: mpsc::Receiver<Job>,
    states: Arc<DashMap<Uuid, JobState>>,
    retention: usize,
) {
    let mut finished = VecDeque::new();

    while let Some(job) = rx.recv().await {
        states.insert(job.id, JobState::Running);
        log::info!("[RUNNER] Running job {} for {}", job.id, job.url);

        let result = assembler.build_report(&job.url, job.sink).await;
        let state = if result.is_ok() {
            JobState::Completed
        } else {
            JobState::Failed
        };
        states.insert(job.id, state);

        // Prune before replying.
        finished.push_back(job.id);
        while finished.len() > retention {
            if let Some(old) = finished.pop_front() {
                states.remove(&old);
                log::debug!("[RUNNER] Released state of finished job {}", old);
            }
        }

        if job.reply.send(result).is_err() {
            log::debug!("[RUNNER] Caller for job {} went away; result discarded", job.id);
        }
    }

    log::info!("[RUNNER] Queue closed, worker stopped");
}

pub enum JobRunner {
    Immediate(Arc<ReportAssembler>),
    Queued(QueuedRunner),
}

impl JobRunner {
    pub fn new(mode: RunnerMode, assembler: Arc<ReportAssembler>, queue_capacity: usize) -> Self {
        match mode {
            RunnerMode::Immediate => JobRunner::Immediate(assembler),
            RunnerMode::Queued => JobRunner::Queued(QueuedRunner::spawn(assembler, queue_capacity)),
        }
    }

    pub fn mode(&self) -> RunnerMode {
        match self {
            JobRunner::Immediate(_) => RunnerMode::Immediate,
            JobRunner::Queued(_) => RunnerMode::Queued,
        }
    }

    /// Run one audit to completion, whichever way this runner executes jobs.
    pub async fn submit(
        &self,
        url: &str,
        sink: Option<Arc<dyn ProgressSink>>,
    ) -> Result<SeoReport> {
        match self {
            JobRunner::Immediate(assembler) => assembler.build_report(url, sink).await,
            JobRunner::Queued(queue) => queue.enqueue(url, sink).await?.wait().await,
        }
    }

    /// Only queued jobs are tracked.
    pub fn job_state(&self, id: Uuid) -> Option<JobState> {
        match self {
            JobRunner::Immediate(_) => None,
            JobRunner::Queued(queue) => queue.job_state(id),
        }
    }
}
