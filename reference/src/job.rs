use crate::client::ReferenceClient;
use crate::metrics_defs::{FETCH_DURATION, JOB_RUNS};
use axum::http::StatusCode;
use pipeline::loader::{LoadJob, LoadSource, Loader, TableId};
use shared::{counter, histogram};
use std::time::Instant;

pub const SUCCESS_MESSAGE: &str = "Carga de clientes completada con éxito.";

/// Pulls the reference list and replaces the destination table with it.
pub struct ReferenceLoadJob {
    client: ReferenceClient,
    loader: Loader,
    destination: TableId,
}

impl ReferenceLoadJob {
    pub fn new(client: ReferenceClient, loader: Loader, destination: TableId) -> Self {
        ReferenceLoadJob {
            client,
            loader,
            destination,
        }
    }

    /// Never fails: every error becomes a 500 with a plain text message.
    pub async fn run(&self) -> (StatusCode, String) {
        let started = Instant::now();
        let fetched = self.client.fetch().await;
        histogram!(FETCH_DURATION).record(started.elapsed().as_secs_f64());

        let batch = match fetched {
            Ok(batch) => batch,
            Err(err) => {
                tracing::error!(url = %self.client.url(), error = %err, "reference fetch failed");
                counter!(JOB_RUNS, "outcome" => "upstream_error").increment(1);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error al llamar a la API: {err}"),
                );
            }
        };

        tracing::info!(records = batch.len(), table = %self.destination, "loading reference data");
        let job = LoadJob::replace(self.destination.clone(), LoadSource::Records(batch));

        match self.loader.load(job).await {
            Ok(_) => {
                counter!(JOB_RUNS, "outcome" => "success").increment(1);
                (StatusCode::OK, SUCCESS_MESSAGE.to_string())
            }
            Err(err) => {
                counter!(JOB_RUNS, "outcome" => "load_error").increment(1);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error al cargar a BigQuery: {err}"),
                )
            }
        }
    }
}
