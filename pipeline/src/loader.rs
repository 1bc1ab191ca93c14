//! Load orchestration: submit a full-replace bulk load and wait for it.
//!
//! The destination table must already exist with a schema matching the data.
//! Nothing here declares or alters schemas.
use crate::errors::LoadError;
use crate::metrics_defs::{LOAD_DURATION, LOAD_FAILURES, LOAD_ROWS};
use crate::records::RecordBatch;
use crate::warehouse::{JobStatus, Warehouse};
use serde::Deserialize;
use shared::{counter, histogram};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fully qualified destination table: `project.dataset.table`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String")]
pub struct TableId {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("invalid table id '{0}': expected project.dataset.table")]
pub struct TableIdError(String);

impl FromStr for TableId {
    type Err = TableIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [project, dataset, table]
                if !project.is_empty() && !dataset.is_empty() && !table.is_empty() =>
            {
                Ok(TableId {
                    project: project.to_string(),
                    dataset: dataset.to_string(),
                    table: table.to_string(),
                })
            }
            _ => Err(TableIdError(s.to_string())),
        }
    }
}

impl TryFrom<String> for TableId {
    type Error = TableIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// Only full replacement exists: the table's visible contents are swapped
/// for the new batch when the job commits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    Truncate,
}

/// Format of a source the warehouse reads directly from storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UriFormat {
    DelimitedText { skip_leading_rows: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadSource {
    /// Streamed by the warehouse from object storage, never buffered here.
    Uri { locator: String, format: UriFormat },
    /// Materialized in memory and uploaded with the job.
    Records(RecordBatch),
}

impl LoadSource {
    pub fn row_count(&self) -> Option<u64> {
        match self {
            LoadSource::Uri { .. } => None,
            LoadSource::Records(batch) => Some(batch.len() as u64),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoadJob {
    pub destination: TableId,
    pub write_mode: WriteMode,
    pub source: LoadSource,
}

impl LoadJob {
    pub fn replace(destination: TableId, source: LoadSource) -> Self {
        LoadJob {
            destination,
            write_mode: WriteMode::Truncate,
            source,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadStats {
    pub job_id: String,
    pub rows: Option<u64>,
}

/// Submits load jobs and blocks the invocation until they are terminal.
///
/// There is no timeout and no retry: a failed job is reported to the caller,
/// which decides whether the trigger is redelivered.
#[derive(Clone)]
pub struct Loader {
    warehouse: Arc<dyn Warehouse>,
    poll_interval: Duration,
}

impl Loader {
    pub fn new(warehouse: Arc<dyn Warehouse>, poll_interval: Duration) -> Self {
        Loader {
            warehouse,
            poll_interval,
        }
    }

    pub async fn load(&self, job: LoadJob) -> Result<LoadStats, LoadError> {
        let table = job.destination.to_string();
        let started = Instant::now();

        let result = self.submit_and_wait(&job).await;

        histogram!(LOAD_DURATION, "table" => table.clone()).record(started.elapsed().as_secs_f64());

        match &result {
            Ok(stats) => {
                tracing::info!(
                    table = %table,
                    job_id = %stats.job_id,
                    rows = ?stats.rows,
                    "load job succeeded"
                );
                if let Some(rows) = stats.rows {
                    histogram!(LOAD_ROWS, "table" => table.clone()).record(rows as f64);
                }
            }
            Err(err) => {
                tracing::error!(table = %table, error = %err, "load job failed");
                counter!(LOAD_FAILURES, "table" => table.clone()).increment(1);
            }
        }

        result
    }

    async fn submit_and_wait(&self, job: &LoadJob) -> Result<LoadStats, LoadError> {
        let handle = self.warehouse.submit(job).await?;
        tracing::debug!(job_id = %handle.job_id, table = %job.destination, "load job submitted");

        loop {
            match self.warehouse.status(&handle).await? {
                JobStatus::Running => tokio::time::sleep(self.poll_interval).await,
                JobStatus::Succeeded { output_rows } => {
                    return Ok(LoadStats {
                        job_id: handle.job_id,
                        rows: output_rows.or_else(|| job.source.row_count()),
                    });
                }
                JobStatus::Failed { reason } => {
                    return Err(LoadError::JobFailed {
                        table: job.destination.to_string(),
                        job_id: handle.job_id,
                        reason,
                    });
                }
            }
        }
    }
}
