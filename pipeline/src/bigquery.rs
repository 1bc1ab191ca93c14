//! BigQuery v2 REST client for load jobs.
use crate::auth::TokenSource;
use crate::loader::{LoadJob, LoadSource, UriFormat, WriteMode};
use crate::warehouse::{JobHandle, JobStatus, Warehouse, WarehouseError};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use url::Url;

const MULTIPART_BOUNDARY: &str = "lakeloader_load_boundary";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResource {
    job_reference: JobReference,
    #[serde(default)]
    status: Option<JobStatusResource>,
    #[serde(default)]
    statistics: Option<JobStatistics>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatusResource {
    state: String,
    #[serde(default)]
    error_result: Option<ErrorProto>,
}

#[derive(Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct JobStatistics {
    #[serde(default)]
    load: Option<LoadStatistics>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadStatistics {
    // int64 values are encoded as JSON strings
    #[serde(default)]
    output_rows: Option<String>,
}

impl JobResource {
    fn status(&self) -> JobStatus {
        let Some(status) = &self.status else {
            return JobStatus::Running;
        };
        if status.state != "DONE" {
            return JobStatus::Running;
        }
        if let Some(error) = &status.error_result {
            let reason = match (&error.reason, &error.message) {
                (Some(reason), Some(message)) => format!("{reason}: {message}"),
                (Some(text), None) | (None, Some(text)) => text.clone(),
                (None, None) => "unknown error".to_string(),
            };
            return JobStatus::Failed { reason };
        }
        let output_rows = self
            .statistics
            .as_ref()
            .and_then(|stats| stats.load.as_ref())
            .and_then(|load| load.output_rows.as_deref())
            .and_then(|rows| rows.parse().ok());
        JobStatus::Succeeded { output_rows }
    }
}

pub struct BigQueryWarehouse {
    client: reqwest::Client,
    base_url: Url,
    project: String,
    auth: Arc<TokenSource>,
}

impl BigQueryWarehouse {
    pub fn new(
        client: reqwest::Client,
        base_url: Url,
        project: String,
        auth: Arc<TokenSource>,
    ) -> Self {
        BigQueryWarehouse {
            client,
            base_url,
            project,
            auth,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, WarehouseError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| WarehouseError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn load_configuration(job: &LoadJob) -> Value {
        let write_disposition = match job.write_mode {
            WriteMode::Truncate => "WRITE_TRUNCATE",
        };
        let mut load = json!({
            "destinationTable": {
                "projectId": job.destination.project,
                "datasetId": job.destination.dataset,
                "tableId": job.destination.table,
            },
            "writeDisposition": write_disposition,
        });

        match &job.source {
            LoadSource::Uri {
                locator,
                format: UriFormat::DelimitedText { skip_leading_rows },
            } => {
                load["sourceFormat"] = json!("CSV");
                load["sourceUris"] = json!([locator]);
                load["skipLeadingRows"] = json!(skip_leading_rows);
            }
            LoadSource::Records(_) => {
                load["sourceFormat"] = json!("NEWLINE_DELIMITED_JSON");
            }
        }

        json!({ "configuration": { "load": load } })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<JobResource, WarehouseError> {
        let response = self.auth.authorize(request).await?.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WarehouseError::Status { status, body });
        }
        Ok(response.json::<JobResource>().await?)
    }
}

fn multipart_related(metadata: &Value, data: &[u8]) -> Result<Vec<u8>, serde_json::Error> {
    let mut body = Vec::with_capacity(data.len() + 512);
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(&serde_json::to_vec(metadata)?);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    Ok(body)
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn submit(&self, job: &LoadJob) -> Result<JobHandle, WarehouseError> {
        let configuration = Self::load_configuration(job);

        let request = match &job.source {
            LoadSource::Uri { .. } => {
                let url = self.endpoint(&["bigquery", "v2", "projects", self.project.as_str(), "jobs"])?;
                self.client.post(url).json(&configuration)
            }
            LoadSource::Records(batch) => {
                let mut url = self.endpoint(&[
                    "upload",
                    "bigquery",
                    "v2",
                    "projects",
                    self.project.as_str(),
                    "jobs",
                ])?;
                url.query_pairs_mut().append_pair("uploadType", "multipart");
                let body = multipart_related(&configuration, &batch.to_ndjson()?)?;
                self.client
                    .post(url)
                    .header(
                        CONTENT_TYPE,
                        format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
                    )
                    .body(body)
            }
        };

        let resource = self.send(request).await?;
        Ok(JobHandle {
            job_id: resource.job_reference.job_id,
            location: resource.job_reference.location,
        })
    }

    async fn status(&self, handle: &JobHandle) -> Result<JobStatus, WarehouseError> {
        let mut url = self.endpoint(&[
            "bigquery",
            "v2",
            "projects",
            self.project.as_str(),
            "jobs",
            handle.job_id.as_str(),
        ])?;
        if let Some(location) = &handle.location {
            url.query_pairs_mut().append_pair("location", location);
        }

        let resource = self.send(self.client.get(url)).await?;
        Ok(resource.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordBatch;
    use crate::testutils::FakeUpstream;
    use reqwest::StatusCode;

    fn warehouse(server: &FakeUpstream) -> BigQueryWarehouse {
        BigQueryWarehouse::new(
            reqwest::Client::new(),
            server.url.clone(),
            "proj".into(),
            Arc::new(TokenSource::anonymous()),
        )
    }

    const INSERTED: &str = r#"{"jobReference":{"projectId":"proj","jobId":"job_abc","location":"US"},"status":{"state":"RUNNING"}}"#;

    #[tokio::test]
    async fn test_uri_load() {
        let server = FakeUpstream::spawn(|req| {
            if req.method == reqwest::Method::POST {
                (StatusCode::OK, INSERTED.into())
            } else {
                (
                    StatusCode::OK,
                    r#"{"jobReference":{"jobId":"job_abc","location":"US"},"status":{"state":"DONE"},"statistics":{"load":{"outputRows":"42"}}}"#.into(),
                )
            }
        })
        .await;
        let warehouse = warehouse(&server);

        let job = LoadJob::replace(
            "proj.sapiens_data.ventas".parse().unwrap(),
            LoadSource::Uri {
                locator: "gs://b1/sales_2024.csv".into(),
                format: UriFormat::DelimitedText {
                    skip_leading_rows: 1,
                },
            },
        );
        let handle = warehouse.submit(&job).await.unwrap();
        assert_eq!(handle.job_id, "job_abc");
        assert_eq!(handle.location.as_deref(), Some("US"));

        assert_eq!(
            warehouse.status(&handle).await.unwrap(),
            JobStatus::Succeeded {
                output_rows: Some(42)
            }
        );

        let requests = server.requests();
        assert_eq!(requests[0].path, "/bigquery/v2/projects/proj/jobs");
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(
            body,
            json!({"configuration": {"load": {
                "destinationTable": {"projectId": "proj", "datasetId": "sapiens_data", "tableId": "ventas"},
                "writeDisposition": "WRITE_TRUNCATE",
                "sourceFormat": "CSV",
                "sourceUris": ["gs://b1/sales_2024.csv"],
                "skipLeadingRows": 1,
            }}})
        );
        assert_eq!(
            requests[1].path,
            "/bigquery/v2/projects/proj/jobs/job_abc?location=US"
        );
    }

    #[tokio::test]
    async fn test_records_upload() {
        let server = FakeUpstream::spawn(|_| (StatusCode::OK, INSERTED.into())).await;
        let warehouse = warehouse(&server);

        let batch = RecordBatch::try_from(json!([{"id": "E1"}, {"id": "E2"}])).unwrap();
        let job = LoadJob::replace(
            "proj.sapiens_data.eventos".parse().unwrap(),
            LoadSource::Records(batch),
        );
        warehouse.submit(&job).await.unwrap();

        let request = &server.requests()[0];
        assert_eq!(
            request.path,
            "/upload/bigquery/v2/projects/proj/jobs?uploadType=multipart"
        );
        assert!(
            request.headers[CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("multipart/related")
        );
        let body = String::from_utf8(request.body.to_vec()).unwrap();
        assert!(body.contains(r#""sourceFormat":"NEWLINE_DELIMITED_JSON""#));
        assert!(body.contains("{\"id\":\"E1\"}\n{\"id\":\"E2\"}"));
    }

    #[tokio::test]
    async fn test_failed_job() {
        let server = FakeUpstream::spawn(|_| {
            (
                StatusCode::OK,
                r#"{"jobReference":{"jobId":"job_x"},"status":{"state":"DONE","errorResult":{"reason":"invalid","message":"Provided Schema does not match Table"}}}"#.into(),
            )
        })
        .await;
        let warehouse = warehouse(&server);

        let status = warehouse
            .status(&JobHandle {
                job_id: "job_x".into(),
                location: None,
            })
            .await
            .unwrap();
        assert_eq!(
            status,
            JobStatus::Failed {
                reason: "invalid: Provided Schema does not match Table".into()
            }
        );
    }

    #[tokio::test]
    async fn test_http_error() {
        let server =
            FakeUpstream::spawn(|_| (StatusCode::NOT_FOUND, "Not found: Dataset".into())).await;
        let warehouse = warehouse(&server);

        let job = LoadJob::replace(
            "proj.missing.ventas".parse().unwrap(),
            LoadSource::Records(RecordBatch::default()),
        );
        let err = warehouse.submit(&job).await.unwrap_err();
        assert!(matches!(
            err,
            WarehouseError::Status { status: StatusCode::NOT_FOUND, .. }
        ));
    }
}
