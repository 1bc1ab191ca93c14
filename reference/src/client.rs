use pipeline::records::{RecordBatch, RecordBatchError};
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum UpstreamError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),
    #[error("{status} returned by {url}")]
    Status { status: StatusCode, url: Url },
    #[error("invalid response body: {0}")]
    Body(#[from] RecordBatchError),
}

/// Fetches the reference entity list over HTTP.
pub struct ReferenceClient {
    client: reqwest::Client,
    url: Url,
}

impl ReferenceClient {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(ReferenceClient { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The response must be a JSON array of objects. An empty array is valid.
    pub async fn fetch(&self) -> Result<RecordBatch, UpstreamError> {
        let response = self.client.get(self.url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status,
                url: self.url.clone(),
            });
        }

        let value = response.json::<serde_json::Value>().await?;
        Ok(RecordBatch::try_from(value)?)
    }
}
