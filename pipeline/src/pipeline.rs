use crate::errors::Result;
use crate::event::{PubSubMessage, accepts, decode_payload};
use crate::loader::{LoadJob, LoadStats, Loader, TableId};
use crate::metrics_defs::{EVENTS_FAILED, EVENTS_FILTERED, EVENTS_RECEIVED, SOURCES_EMPTY};
use crate::source::SourceReader;
use shared::counter;
use std::fmt;
use std::sync::Arc;

/// Successful result of one invocation. The delivery is acknowledged in all cases.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The event is tagged for another pipeline.
    FilteredOut,
    /// The source held no records.
    Empty,
    Loaded(LoadStats),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::FilteredOut => write!(f, "ignored"),
            Outcome::Empty => write!(f, "no records to load"),
            Outcome::Loaded(stats) => match stats.rows {
                Some(rows) => write!(f, "loaded {rows} rows (job {})", stats.job_id),
                None => write!(f, "loaded (job {})", stats.job_id),
            },
        }
    }
}

/// Filter, decode, read and load for one tagged file type.
pub struct Pipeline {
    name: String,
    file_type: String,
    destination: TableId,
    reader: Arc<dyn SourceReader>,
    loader: Loader,
}

impl Pipeline {
    pub fn new(
        name: impl Into<String>,
        file_type: impl Into<String>,
        destination: TableId,
        reader: Arc<dyn SourceReader>,
        loader: Loader,
    ) -> Self {
        Pipeline {
            name: name.into(),
            file_type: file_type.into(),
            destination,
            reader,
            loader,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn process(&self, message: &PubSubMessage) -> Result<Outcome> {
        counter!(EVENTS_RECEIVED, "pipeline" => self.name.clone()).increment(1);

        let result = self.handle(message).await;
        if let Err(err) = &result {
            tracing::error!(
                pipeline = %self.name,
                message_id = ?message.message_id,
                kind = err.kind(),
                error = %err,
                "invocation failed"
            );
            counter!(EVENTS_FAILED, "pipeline" => self.name.clone(), "kind" => err.kind())
                .increment(1);
        }
        result
    }

    async fn handle(&self, message: &PubSubMessage) -> Result<Outcome> {
        if !accepts(&message.attributes, &self.file_type) {
            tracing::info!(
                pipeline = %self.name,
                attributes = ?message.attributes,
                "ignoring event for another file type"
            );
            counter!(EVENTS_FILTERED, "pipeline" => self.name.clone()).increment(1);
            return Ok(Outcome::FilteredOut);
        }

        let object = decode_payload(message)?;
        tracing::info!(
            pipeline = %self.name,
            bucket = %object.bucket,
            file = %object.name,
            "processing upload"
        );

        let Some(source) = self.reader.read(&object).await? else {
            counter!(SOURCES_EMPTY, "pipeline" => self.name.clone()).increment(1);
            return Ok(Outcome::Empty);
        };

        let job = LoadJob::replace(self.destination.clone(), source);
        let stats = self.loader.load(job).await?;
        tracing::info!(
            pipeline = %self.name,
            file = %object.name,
            table = %self.destination,
            rows = ?stats.rows,
            "file loaded"
        );
        Ok(Outcome::Loaded(stats))
    }
}
