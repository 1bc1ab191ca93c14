use crate::customers::{Customer, customers};
use crate::job::ReferenceLoadJob;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use pipeline::config::Listener;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(thiserror::Error, Debug)]
pub enum ReferenceApiError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub fn router(job: Arc<ReferenceLoadJob>) -> Router {
    Router::new()
        .route("/api/customers", get(list_customers))
        .route("/jobs/load-customers", get(load_customers).post(load_customers))
        .with_state(job)
}

pub async fn serve(listener: &Listener, job: Arc<ReferenceLoadJob>) -> Result<(), ReferenceApiError> {
    let addr = format!("{}:{}", listener.host, listener.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = ?listener.local_addr()?, "listening");

    axum::serve(listener, router(job)).await?;
    Ok(())
}

async fn list_customers() -> (StatusCode, Json<Vec<Customer>>) {
    (StatusCode::OK, Json(customers()))
}

async fn load_customers(State(job): State<Arc<ReferenceLoadJob>>) -> (StatusCode, String) {
    job.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ReferenceClient;
    use pipeline::loader::{LoadSource, Loader, TableId};
    use pipeline::warehouse::MemoryWarehouse;
    use std::time::Duration;
    use url::Url;

    async fn spawn(app: Router) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://127.0.0.1:{port}")).unwrap()
    }

    fn table() -> TableId {
        "proj.sapiens_data.clientes".parse().unwrap()
    }

    fn job(api_url: Url, warehouse: Arc<MemoryWarehouse>) -> Arc<ReferenceLoadJob> {
        job_with_timeout(api_url, warehouse, Duration::from_secs(5))
    }

    fn job_with_timeout(
        api_url: Url,
        warehouse: Arc<MemoryWarehouse>,
        timeout: Duration,
    ) -> Arc<ReferenceLoadJob> {
        Arc::new(ReferenceLoadJob::new(
            ReferenceClient::new(api_url, timeout).unwrap(),
            Loader::new(warehouse, Duration::from_millis(1)),
            table(),
        ))
    }

    #[tokio::test]
    async fn test_customers_endpoint() {
        let warehouse = Arc::new(MemoryWarehouse::new());
        let base = spawn(router(job(
            Url::parse("http://127.0.0.1:9/").unwrap(),
            warehouse,
        )))
        .await;

        let response = reqwest::get(base.join("/api/customers").unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Vec<Customer> = response.json().await.unwrap();
        assert_eq!(body, customers());
        assert_eq!(body.len(), 10);
    }

    #[tokio::test]
    async fn test_load_customers_from_stub() {
        let warehouse = Arc::new(MemoryWarehouse::new().recording());
        // A second instance of the service acts as the upstream stub
        let upstream = spawn(router(job(
            Url::parse("http://127.0.0.1:9/").unwrap(),
            Arc::new(MemoryWarehouse::new()),
        )))
        .await;
        let base = spawn(router(job(
            upstream.join("/api/customers").unwrap(),
            warehouse.clone(),
        )))
        .await;

        let client = reqwest::Client::new();
        for method in [reqwest::Method::GET, reqwest::Method::POST] {
            let response = client
                .request(method, base.join("/jobs/load-customers").unwrap())
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response.text().await.unwrap(),
                "Carga de clientes completada con éxito."
            );
        }

        assert_eq!(warehouse.submitted_jobs().len(), 2);
        assert!(matches!(
            warehouse.table(&table()),
            Some(LoadSource::Records(batch)) if batch.len() == 10
        ));
    }

    #[tokio::test]
    async fn test_upstream_error_skips_load() {
        let upstream = spawn(Router::new().route(
            "/api/customers",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;
        let warehouse = Arc::new(MemoryWarehouse::new().recording());
        let job = job(upstream.join("/api/customers").unwrap(), warehouse.clone());

        let (status, text) = job.run().await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(text.starts_with("Error al llamar a la API: "));
        assert!(text.contains("503"));
        assert!(warehouse.submitted_jobs().is_empty());
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let upstream = spawn(Router::new().route(
            "/api/customers",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(customers())
            }),
        ))
        .await;
        let warehouse = Arc::new(MemoryWarehouse::new().recording());
        let job = job_with_timeout(
            upstream.join("/api/customers").unwrap(),
            warehouse.clone(),
            Duration::from_millis(200),
        );

        let started = std::time::Instant::now();
        let (status, text) = job.run().await;
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(text.starts_with("Error al llamar a la API: "));
        assert!(warehouse.submitted_jobs().is_empty());
        assert_eq!(warehouse.table(&table()), None);
    }

    #[tokio::test]
    async fn test_non_array_body_is_an_upstream_error() {
        let upstream = spawn(Router::new().route(
            "/api/customers",
            get(|| async { Json(serde_json::json!({"clientes": []})) }),
        ))
        .await;
        let warehouse = Arc::new(MemoryWarehouse::new().recording());
        let job = job(upstream.join("/api/customers").unwrap(), warehouse.clone());

        let (status, text) = job.run().await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(text.starts_with("Error al llamar a la API: "));
        assert!(warehouse.submitted_jobs().is_empty());
    }

    #[tokio::test]
    async fn test_load_failure() {
        let upstream = spawn(Router::new().route(
            "/api/customers",
            get(|| async { Json(customers()) }),
        ))
        .await;
        let warehouse = Arc::new(MemoryWarehouse::new().recording());
        warehouse.fail_jobs("Access Denied: Table clientes");
        let job = job(upstream.join("/api/customers").unwrap(), warehouse.clone());

        let (status, text) = job.run().await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(text.starts_with("Error al cargar a BigQuery: "));
        assert!(text.contains("Access Denied"));
    }

    #[tokio::test]
    async fn test_empty_list_is_loaded() {
        let upstream = spawn(Router::new().route(
            "/api/customers",
            get(|| async { Json(Vec::<Customer>::new()) }),
        ))
        .await;
        let warehouse = Arc::new(MemoryWarehouse::new().recording());
        let job = job(upstream.join("/api/customers").unwrap(), warehouse.clone());

        let (status, _) = job.run().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(warehouse.submitted_jobs().len(), 1);
    }
}
