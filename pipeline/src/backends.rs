use crate::auth::{AuthError, TokenSource};
use crate::bigquery::BigQueryWarehouse;
use crate::config::{DEFAULT_BIGQUERY_URL, GcpConfig};
use crate::storage::{GcsObjectStore, MemoryObjectStore, ObjectStore, StorageError};
use crate::warehouse::{MemoryWarehouse, Warehouse};
use std::sync::Arc;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("invalid backend URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Shared handles to the storage and warehouse collaborators. Cloning is cheap.
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn ObjectStore>,
    pub warehouse: Arc<dyn Warehouse>,
}

impl Backends {
    pub async fn from_config(config: &GcpConfig) -> Result<Self, BackendError> {
        match config {
            GcpConfig::Memory => {
                tracing::warn!("using in-memory storage and warehouse, loads are not persisted");
                Ok(Backends {
                    store: Arc::new(MemoryObjectStore::new()),
                    warehouse: Arc::new(MemoryWarehouse::new()),
                })
            }
            GcpConfig::Google {
                project,
                storage_url,
                bigquery_url,
                auth,
            } => {
                let bigquery_url = match bigquery_url {
                    Some(url) => url.clone(),
                    None => Url::parse(DEFAULT_BIGQUERY_URL)?,
                };

                let store = GcsObjectStore::connect(storage_url.as_ref(), *auth).await?;
                let tokens = Arc::new(TokenSource::from_mode(*auth).await?);
                let client = reqwest::Client::builder().build()?;

                Ok(Backends {
                    store: Arc::new(store),
                    warehouse: Arc::new(BigQueryWarehouse::new(
                        client,
                        bigquery_url,
                        project.clone(),
                        tokens,
                    )),
                })
            }
        }
    }
}
