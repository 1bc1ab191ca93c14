//! Read access to uploaded objects.
use crate::auth::AuthMode;
use crate::event::ObjectRef;
use async_trait::async_trait;
use google_cloud_auth::credentials::anonymous;
use google_cloud_storage::client::Storage;
use std::collections::HashMap;
use std::sync::RwLock;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("object is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("storage request failed: {0}")]
    Request(#[from] google_cloud_storage::Error),
    #[error("failed to build storage client: {0}")]
    Client(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Downloads the whole object and decodes it as UTF-8 text.
    async fn read_to_string(&self, object: &ObjectRef) -> Result<String, StorageError>;
}

/// Cloud Storage client.
pub struct GcsObjectStore {
    client: Storage,
}

impl GcsObjectStore {
    /// Connects with application default credentials, or anonymously for
    /// [`AuthMode::None`]. `endpoint` overrides the public Cloud Storage endpoint.
    pub async fn connect(endpoint: Option<&Url>, auth: AuthMode) -> Result<Self, StorageError> {
        let mut builder = Storage::builder();
        if let Some(endpoint) = endpoint {
            builder = builder.with_endpoint(endpoint.as_str().trim_end_matches('/'));
        }
        if auth == AuthMode::None {
            builder = builder.with_credentials(anonymous::Builder::new().build());
        }

        let client = builder
            .build()
            .await
            .map_err(|e| StorageError::Client(e.to_string()))?;
        Ok(GcsObjectStore { client })
    }
}

fn read_error(err: google_cloud_storage::Error, object: &ObjectRef) -> StorageError {
    if err.http_status_code() == Some(404) {
        StorageError::NotFound(object.locator("gs"))
    } else {
        StorageError::Request(err)
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn read_to_string(&self, object: &ObjectRef) -> Result<String, StorageError> {
        let mut reader = self
            .client
            .read_object(format!("projects/_/buckets/{}", object.bucket), &object.name)
            .send()
            .await
            .map_err(|err| read_error(err, object))?;

        let mut contents = Vec::new();
        while let Some(chunk) = reader
            .next()
            .await
            .transpose()
            .map_err(|err| read_error(err, object))?
        {
            contents.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8(contents)?)
    }
}

/// In-process object store for local runs and tests.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<(String, String), String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, object: ObjectRef, contents: impl Into<String>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert((object.bucket, object.name), contents.into());
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn read_to_string(&self, object: &ObjectRef) -> Result<String, StorageError> {
        let objects = self
            .objects
            .read()
            .map_err(|_| StorageError::Internal("lock poisoned".into()))?;

        objects
            .get(&(object.bucket.clone(), object.name.clone()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(object.locator("gs")))
    }
}
