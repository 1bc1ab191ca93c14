//! Source readers turn an uploaded object into something the loader can use.
//!
//! Delimited text is never read here: the warehouse streams it straight from
//! storage. Record-oriented objects are downloaded and parsed in full.
use crate::errors::SourceReadError;
use crate::event::ObjectRef;
use crate::loader::{LoadSource, UriFormat};
use crate::records::RecordBatch;
use crate::storage::ObjectStore;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Delimited text files carry exactly one header row.
pub const HEADER_ROWS: u32 = 1;

pub const STORAGE_SCHEME: &str = "gs";

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    DelimitedText,
    Records,
}

#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Returns `None` when the object holds nothing to load.
    async fn read(&self, object: &ObjectRef) -> Result<Option<LoadSource>, SourceReadError>;
}

#[derive(Default)]
pub struct DelimitedTextReader;

#[async_trait]
impl SourceReader for DelimitedTextReader {
    async fn read(&self, object: &ObjectRef) -> Result<Option<LoadSource>, SourceReadError> {
        Ok(Some(LoadSource::Uri {
            locator: object.locator(STORAGE_SCHEME),
            format: UriFormat::DelimitedText {
                skip_leading_rows: HEADER_ROWS,
            },
        }))
    }
}

pub struct RecordReader {
    store: Arc<dyn ObjectStore>,
}

impl RecordReader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        RecordReader { store }
    }
}

#[async_trait]
impl SourceReader for RecordReader {
    async fn read(&self, object: &ObjectRef) -> Result<Option<LoadSource>, SourceReadError> {
        let locator = object.locator(STORAGE_SCHEME);

        let text = self
            .store
            .read_to_string(object)
            .await
            .map_err(|source| SourceReadError::Fetch {
                locator: locator.clone(),
                source,
            })?;

        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|source| SourceReadError::Json {
                locator: locator.clone(),
                source,
            })?;

        let batch = RecordBatch::try_from(value).map_err(|source| SourceReadError::Records {
            locator: locator.clone(),
            source,
        })?;

        if batch.is_empty() {
            tracing::info!(file = %locator, "source contains no records, nothing to load");
            return Ok(None);
        }

        tracing::debug!(file = %locator, records = batch.len(), "parsed records");
        Ok(Some(LoadSource::Records(batch)))
    }
}

pub fn reader_for(format: SourceFormat, store: Arc<dyn ObjectStore>) -> Arc<dyn SourceReader> {
    match format {
        SourceFormat::DelimitedText => Arc::new(DelimitedTextReader),
        SourceFormat::Records => Arc::new(RecordReader::new(store)),
    }
}
