use gcp_auth::TokenProvider;
use reqwest::RequestBuilder;
use serde::Deserialize;
use std::sync::Arc;

const SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Where credentials for storage and warehouse requests come from.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Application Default Credentials: key file, gcloud login or metadata server.
    #[default]
    Default,
    /// No credentials, e.g. for emulators.
    None,
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("failed to initialize credentials: {0}")]
    Init(#[source] gcp_auth::Error),
    #[error("token request failed: {0}")]
    Token(#[source] gcp_auth::Error),
}

/// Bearer tokens for warehouse requests. The provider caches and refreshes tokens.
pub struct TokenSource {
    provider: Option<Arc<dyn TokenProvider>>,
}

impl TokenSource {
    pub async fn from_mode(mode: AuthMode) -> Result<Self, AuthError> {
        match mode {
            AuthMode::Default => {
                let provider = gcp_auth::provider().await.map_err(AuthError::Init)?;
                tracing::info!("using application default credentials");
                Ok(TokenSource {
                    provider: Some(provider),
                })
            }
            AuthMode::None => Ok(Self::anonymous()),
        }
    }

    pub fn anonymous() -> Self {
        TokenSource { provider: None }
    }

    pub async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, AuthError> {
        let Some(provider) = &self.provider else {
            return Ok(request);
        };

        let token = provider.token(SCOPES).await.map_err(AuthError::Token)?;
        Ok(request.bearer_auth(token.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_anonymous_requests_are_unchanged() {
        let source = TokenSource::from_mode(AuthMode::None).await.unwrap();
        let request = source
            .authorize(reqwest::Client::new().get("http://127.0.0.1/"))
            .await
            .unwrap()
            .build()
            .unwrap();

        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn test_auth_mode_names() {
        assert_eq!(
            serde_yaml::from_str::<AuthMode>("default").unwrap(),
            AuthMode::Default
        );
        assert_eq!(
            serde_yaml::from_str::<AuthMode>("none").unwrap(),
            AuthMode::None
        );
        assert!(serde_yaml::from_str::<AuthMode>("metadata_server").is_err());
        assert_eq!(AuthMode::default(), AuthMode::Default);
    }
}
