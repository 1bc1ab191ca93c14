//! The analytical warehouse seam: submit a load job, then poll it.
use crate::auth::AuthError;
use crate::loader::{LoadJob, LoadSource, TableId};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(thiserror::Error, Debug)]
pub enum WarehouseError {
    #[error("warehouse request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("warehouse returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("could not encode load payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("credentials error: {0}")]
    Auth(#[from] AuthError),
    #[error("invalid warehouse URL: {0}")]
    InvalidUrl(String),
    #[error("unknown load job {0}")]
    UnknownJob(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: String,
    pub location: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Succeeded { output_rows: Option<u64> },
    Failed { reason: String },
}

#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn submit(&self, job: &LoadJob) -> Result<JobHandle, WarehouseError>;

    async fn status(&self, handle: &JobHandle) -> Result<JobStatus, WarehouseError>;
}

struct PendingJob {
    job: LoadJob,
    remaining_polls: usize,
    failure: Option<String>,
}

#[derive(Default)]
struct State {
    jobs: HashMap<String, PendingJob>,
    // Only kept when recording
    submitted: Option<Vec<LoadJob>>,
    tables: HashMap<TableId, LoadSource>,
    status_polls: usize,
    next_job: u64,
}

/// In-process warehouse. A job's source replaces the table contents only when
/// the job reaches a successful terminal state. A job is forgotten once its
/// terminal status has been read.
#[derive(Default)]
pub struct MemoryWarehouse {
    pending_polls: usize,
    failure: Mutex<Option<String>>,
    state: Mutex<State>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs report `Running` this many times before completing.
    pub fn with_pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Keeps a log of every submitted job for [`MemoryWarehouse::submitted_jobs`].
    pub fn recording(self) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.submitted = Some(Vec::new());
        }
        self
    }

    /// Jobs submitted from now on fail with the given reason.
    pub fn fail_jobs(&self, reason: impl Into<String>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(reason.into());
        }
    }

    /// Jobs submitted since [`MemoryWarehouse::recording`] was enabled.
    pub fn submitted_jobs(&self) -> Vec<LoadJob> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.submitted.clone())
            .unwrap_or_default()
    }

    /// Jobs whose terminal status has not been read yet.
    pub fn pending_jobs(&self) -> usize {
        self.state.lock().map(|state| state.jobs.len()).unwrap_or(0)
    }

    pub fn status_polls(&self) -> usize {
        self.state.lock().map(|state| state.status_polls).unwrap_or(0)
    }

    /// Current committed contents of a table.
    pub fn table(&self, table: &TableId) -> Option<LoadSource> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.tables.get(table).cloned())
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, WarehouseError> {
        self.state
            .lock()
            .map_err(|_| WarehouseError::Internal("lock poisoned".into()))
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn submit(&self, job: &LoadJob) -> Result<JobHandle, WarehouseError> {
        let failure = self
            .failure
            .lock()
            .map_err(|_| WarehouseError::Internal("lock poisoned".into()))?
            .clone();

        let mut state = self.state()?;
        state.next_job += 1;
        let job_id = format!("job_{}", state.next_job);

        if let Some(submitted) = state.submitted.as_mut() {
            submitted.push(job.clone());
        }
        state.jobs.insert(
            job_id.clone(),
            PendingJob {
                job: job.clone(),
                remaining_polls: self.pending_polls,
                failure,
            },
        );

        Ok(JobHandle {
            job_id,
            location: None,
        })
    }

    async fn status(&self, handle: &JobHandle) -> Result<JobStatus, WarehouseError> {
        let mut state = self.state()?;
        state.status_polls += 1;

        let pending = state
            .jobs
            .get_mut(&handle.job_id)
            .ok_or_else(|| WarehouseError::UnknownJob(handle.job_id.clone()))?;

        if pending.remaining_polls > 0 {
            pending.remaining_polls -= 1;
            return Ok(JobStatus::Running);
        }

        let Some(pending) = state.jobs.remove(&handle.job_id) else {
            return Err(WarehouseError::UnknownJob(handle.job_id.clone()));
        };

        match pending.failure {
            Some(reason) => Ok(JobStatus::Failed { reason }),
            None => {
                let output_rows = pending.job.source.row_count();
                state
                    .tables
                    .insert(pending.job.destination, pending.job.source);
                Ok(JobStatus::Succeeded { output_rows })
            }
        }
    }
}
