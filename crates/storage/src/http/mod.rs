use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use exam_core::model::{AttemptSubmission, SubmissionResult, TestDefinition, TestId};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

use crate::repository::{AssessmentStore, StoreError};

mod mapping;

/// Connection settings for the REST backend.
#[derive(Clone, Debug)]
pub struct HttpStoreConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
}

impl HttpStoreConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: None,
            timeout: Duration::from_secs(15),
        }
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// `AssessmentStore` backed by the portal's REST API.
///
/// Every request carries the current bearer credential. A rejected credential
/// surfaces as `StoreError::Unauthorized`; after re-authentication the caller
/// installs the new token with [`HttpAssessmentStore::set_bearer_token`].
pub struct HttpAssessmentStore {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpAssessmentStore {
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the HTTP client cannot be built.
    pub fn new(config: HttpStoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            token: RwLock::new(config.bearer_token),
        })
    }

    /// Replace the bearer credential used by subsequent requests.
    pub fn set_bearer_token(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.into());
        }
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, StoreError> {
        let guard = self
            .token
            .read()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(match guard.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self.authorized(request)?.send().await.map_err(transport)?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "assessment store responded");
        if status.is_success() {
            Ok(response)
        } else {
            Err(status_error(status))
        }
    }
}

#[async_trait]
impl AssessmentStore for HttpAssessmentStore {
    async fn fetch_test(&self, id: &TestId) -> Result<TestDefinition, StoreError> {
        let url = format!("{}/tests/{}", self.base_url, id);
        let response = self.send(self.client.get(url)).await?;
        let dto: mapping::TestDto = response.json().await.map_err(transport)?;
        mapping::map_test(dto)
    }

    async fn submit_attempt(
        &self,
        submission: &AttemptSubmission,
    ) -> Result<SubmissionResult, StoreError> {
        let url = format!("{}/results", self.base_url);
        let body = mapping::submission_body(submission);
        let response = self.send(self.client.post(url).json(&body)).await?;

        let bytes = response.bytes().await.map_err(transport)?;
        if bytes.is_empty() {
            return Ok(mapping::map_submission_response(Default::default()));
        }
        let dto = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(mapping::map_submission_response(dto))
    }
}

fn transport(e: reqwest::Error) -> StoreError {
    if e.is_decode() {
        StoreError::Serialization(e.to_string())
    } else {
        StoreError::Connection(e.to_string())
    }
}

fn status_error(status: StatusCode) -> StoreError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized,
        StatusCode::NOT_FOUND => StoreError::NotFound,
        StatusCode::CONFLICT => StoreError::Conflict,
        other => StoreError::Http {
            status: other.as_u16(),
        },
    }
}
