//! [`ServiceClient`]: HTTP client for the huginnd API.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::types::{
    BatchClassifyRequest, BatchResult, ClassificationResponse, ClassificationResult,
    ClassifyRequest, HealthResponse,
};
use crate::{HuginnError, Result};

/// Default daemon address.
pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:8000";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Client for a remote huginnd server.
#[derive(Clone)]
pub struct ServiceClient {
    http: Client,
    base_url: String,
}

impl ServiceClient {
    /// Create a client for the server at `base_url`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = ServiceClient::new("http://127.0.0.1:8000")?;
    /// let health = client.health().await?;
    /// ```
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(crate::user_agent())
            .build()
            .map_err(|e| HuginnError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .http
            .get(self.url("health"))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        decode(response).await
    }

    /// `POST /classify`. The server records the result to its sinks.
    pub async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let response = self
            .http
            .post(self.url("classify"))
            .json(&ClassifyRequest {
                text: text.to_string(),
            })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        decode::<ClassificationResponse>(response)
            .await
            .map(Into::into)
    }

    /// `POST /batch-classify`.
    pub async fn classify_batch(&self, reviews: &[String], log_results: bool) -> Result<BatchResult> {
        let response = self
            .http
            .post(self.url("batch-classify"))
            .json(&BatchClassifyRequest {
                reviews: reviews.to_vec(),
                log_results,
            })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        decode(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn transport_error(&self, e: reqwest::Error) -> HuginnError {
        HuginnError::Http(format!("request to {} failed: {e}", self.base_url))
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Decode a success body, or turn an error envelope into [`HuginnError`].
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| HuginnError::Http(format!("failed to read response: {e}")))?;

    if status.is_success() {
        return Ok(serde_json::from_str(&body)?);
    }

    Err(match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => match envelope.error.code.as_str() {
            "SCORING_UNAVAILABLE" => HuginnError::ScoringUnavailable(envelope.error.message),
            "INVALID_BATCH_INPUT" => HuginnError::InvalidBatchInput(envelope.error.message),
            _ => HuginnError::Api {
                status: status.as_u16(),
                message: envelope.error.message,
            },
        },
        Err(_) => HuginnError::Api {
            status: status.as_u16(),
            message: body,
        },
    })
}
