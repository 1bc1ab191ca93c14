use crate::auth::AuthMode;
use crate::loader::TableId;
use crate::source::SourceFormat;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("At least one pipeline must be configured")]
    NoPipelines,

    #[error("Empty pipeline name")]
    EmptyPipelineName,

    #[error("Duplicate pipeline name: {0}")]
    DuplicatePipeline(String),

    #[error("Pipeline {0} has an empty file_type")]
    EmptyFileType(String),

    #[error("Load poll interval cannot be 0")]
    InvalidPollInterval,

    #[error("Empty GCP project")]
    EmptyProject,
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

pub const DEFAULT_BIGQUERY_URL: &str = "https://bigquery.googleapis.com/";

/// Object storage and warehouse backends.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GcpConfig {
    /// In-process store and warehouse, nothing leaves the process.
    Memory,
    Google {
        /// Project that owns the load jobs.
        project: String,
        /// Overrides the Cloud Storage endpoint, e.g. for an emulator.
        #[serde(default)]
        storage_url: Option<Url>,
        /// Defaults to [`DEFAULT_BIGQUERY_URL`]
        #[serde(default)]
        bigquery_url: Option<Url>,
        #[serde(default)]
        auth: AuthMode,
    },
}

impl GcpConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            GcpConfig::Google { project, .. } if project.is_empty() => {
                Err(ValidationError::EmptyProject)
            }
            _ => Ok(()),
        }
    }
}

/// One filtered ingestion pipeline.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Served at `/pipelines/{name}`
    pub name: String,
    /// Value of the `file_type` attribute this pipeline acts on
    pub file_type: String,
    pub format: SourceFormat,
    pub destination: TableId,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Push endpoint listener
    pub listener: Listener,
    /// Health and readiness probes
    pub admin_listener: Listener,
    pub gcp: GcpConfig,
    #[serde(default = "default_poll_interval_ms")]
    pub load_poll_interval_ms: u64,
    pub pipelines: Vec<PipelineConfig>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        self.gcp.validate()?;

        if self.load_poll_interval_ms == 0 {
            return Err(ValidationError::InvalidPollInterval);
        }
        if self.pipelines.is_empty() {
            return Err(ValidationError::NoPipelines);
        }

        let mut names = HashSet::new();
        for pipeline in &self.pipelines {
            if pipeline.name.is_empty() {
                return Err(ValidationError::EmptyPipelineName);
            }
            if !names.insert(&pipeline.name) {
                return Err(ValidationError::DuplicatePipeline(pipeline.name.clone()));
            }
            if pipeline.file_type.is_empty() {
                return Err(ValidationError::EmptyFileType(pipeline.name.clone()));
            }
        }

        Ok(())
    }

    pub fn load_poll_interval(&self) -> Duration {
        Duration::from_millis(self.load_poll_interval_ms)
    }
}
