pub mod api;
pub mod client;
pub mod config;
pub mod customers;
pub mod job;
pub mod metrics_defs;

use crate::client::ReferenceClient;
use crate::job::ReferenceLoadJob;
use pipeline::backends::{BackendError, Backends};
use pipeline::config::ValidationError;
use pipeline::loader::Loader;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum ReferenceError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error(transparent)]
    Api(#[from] api::ReferenceApiError),
}

pub async fn run(config: config::Config) -> Result<(), ReferenceError> {
    config.validate()?;

    let backends = Backends::from_config(&config.gcp).await?;
    let job = ReferenceLoadJob::new(
        ReferenceClient::new(config.api_url.clone(), config.timeout())?,
        Loader::new(backends.warehouse, config.load_poll_interval()),
        config.destination.clone(),
    );
    tracing::info!(
        api_url = %config.api_url,
        destination = %config.destination,
        "reference service configured"
    );

    api::serve(&config.listener, Arc::new(job)).await?;
    Ok(())
}
