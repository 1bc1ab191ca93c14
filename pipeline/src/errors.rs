use crate::records::RecordBatchError;
use crate::storage::StorageError;
use crate::warehouse::WarehouseError;
use thiserror::Error;

/// Result type alias for a single pipeline invocation
pub type Result<T, E = IngestError> = std::result::Result<T, E>;

/// The push envelope or the payload inside it could not be decoded.
#[derive(Error, Debug)]
pub enum MalformedEventError {
    #[error("push request is not a valid envelope: {0}")]
    Envelope(serde_json::Error),

    #[error("the event does not contain the 'data' field")]
    MissingData,

    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("payload is not a valid event body: {0}")]
    Body(serde_json::Error),
}

/// The source object referenced by an event could not be read or parsed.
#[derive(Error, Debug)]
pub enum SourceReadError {
    #[error("could not fetch {locator}: {source}")]
    Fetch {
        locator: String,
        source: StorageError,
    },

    #[error("{locator} is not valid JSON: {source}")]
    Json {
        locator: String,
        source: serde_json::Error,
    },

    #[error("{locator} cannot be loaded: {source}")]
    Records {
        locator: String,
        source: RecordBatchError,
    },
}

/// The bulk load did not reach a successful terminal state.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("warehouse request failed: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("load job {job_id} into {table} failed: {reason}")]
    JobFailed {
        table: String,
        job_id: String,
        reason: String,
    },
}

/// Errors that terminate a message-triggered invocation. They are surfaced to
/// the delivery system so that the message is redelivered.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("malformed event: {0}")]
    MalformedEvent(#[from] MalformedEventError),

    #[error("source read error: {0}")]
    SourceRead(#[from] SourceReadError),

    #[error("load error: {0}")]
    Load(#[from] LoadError),
}

impl IngestError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::MalformedEvent(_) => "malformed_event",
            IngestError::SourceRead(_) => "source_read",
            IngestError::Load(_) => "load",
        }
    }
}
