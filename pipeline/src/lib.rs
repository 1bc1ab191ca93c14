pub mod auth;
pub mod backends;
pub mod bigquery;
pub mod config;
pub mod errors;
pub mod event;
pub mod loader;
pub mod metrics_defs;
pub mod pipeline;
pub mod records;
pub mod service;
pub mod source;
pub mod storage;
pub mod warehouse;

#[cfg(test)]
mod testutils;

use crate::backends::{BackendError, Backends};
use crate::config::{Config, ValidationError};
use crate::loader::Loader;
use crate::pipeline::Pipeline;
use crate::service::PipelineService;
use crate::source::reader_for;
use shared::admin_service::AdminService;
use shared::http::run_http_service;

#[derive(thiserror::Error, Debug)]
pub enum ServeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Builds one pipeline per configured entry, all sharing the same backends.
pub fn build_pipelines(config: &Config, backends: &Backends) -> Vec<Pipeline> {
    let loader = Loader::new(backends.warehouse.clone(), config.load_poll_interval());

    config
        .pipelines
        .iter()
        .map(|entry| {
            Pipeline::new(
                entry.name.clone(),
                entry.file_type.clone(),
                entry.destination.clone(),
                reader_for(entry.format, backends.store.clone()),
                loader.clone(),
            )
        })
        .collect()
}

pub async fn run(config: Config) -> Result<(), ServeError> {
    config.validate()?;

    let backends = Backends::from_config(&config.gcp).await?;
    let pipelines = build_pipelines(&config, &backends);
    for pipeline in &config.pipelines {
        tracing::info!(
            pipeline = %pipeline.name,
            file_type = %pipeline.file_type,
            destination = %pipeline.destination,
            "pipeline configured"
        );
    }

    let push_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        PipelineService::new(pipelines),
    );
    // Pipelines are fully built before any listener starts
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::new(|| true),
    );

    tokio::try_join!(push_task, admin_task)?;
    Ok(())
}
