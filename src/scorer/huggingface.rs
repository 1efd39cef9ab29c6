//! Hugging Face Inference API scorer.
//!
//! Calls the hosted zero-shot-classification pipeline. See:
//! <https://huggingface.co/docs/inference-providers/tasks/zero-shot-classification>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{CategoryScorer, ScoringMode};
use crate::types::{HypothesisTemplate, ScoredCategory};
use crate::{HuginnError, Result};

/// Default base URL for the hosted inference API.
pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/hf-inference";

/// Zero-shot model used when none is configured.
pub const DEFAULT_MODEL: &str = "facebook/bart-large-mnli";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Scorer backed by the Hugging Face Inference API.
#[derive(Clone)]
pub struct HuggingFaceScorer {
    api_key: Option<String>,
    http: Client,
    base_url: String,
    model: String,
    mode: ScoringMode,
}

impl HuggingFaceScorer {
    /// Create a scorer for `model` against the public API.
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    /// Create a scorer with a custom base URL (self-hosted endpoints, wiremock).
    pub fn with_base_url(
        api_key: Option<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(crate::user_agent())
            .build()
            .map_err(|e| HuginnError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            mode: ScoringMode::default(),
        })
    }

    /// Set single- or multi-label scoring.
    pub fn mode(mut self, mode: ScoringMode) -> Self {
        self.mode = mode;
        self
    }

    async fn request(
        &self,
        text: &str,
        categories: &[&str],
        template: &HypothesisTemplate,
    ) -> Result<ZeroShotResponse> {
        let url = format!("{}/models/{}", self.base_url, self.model);

        let mut request = self.http.post(&url).json(&ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels: categories,
                hypothesis_template: template.as_str(),
                multi_label: self.mode.is_multi_label(),
            },
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| unavailable(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after, &body, &self.model));
        }

        response
            .json()
            .await
            .map_err(|e| unavailable(format!("undecodable response from {}: {e}", self.model)))
    }
}

#[async_trait]
impl CategoryScorer for HuggingFaceScorer {
    fn name(&self) -> &str {
        "huggingface"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn score(
        &self,
        text: &str,
        categories: &[&str],
        template: &HypothesisTemplate,
    ) -> Result<Vec<ScoredCategory>> {
        let response = self.request(text, categories, template).await?;
        let scored = response.into_scored()?;
        debug!(model = %self.model, labels = scored.len(), "zero-shot scores received");
        Ok(scored)
    }
}

fn unavailable(reason: String) -> HuginnError {
    HuginnError::ScoringUnavailable(reason)
}

/// Map a non-success status to a `ScoringUnavailable` reason.
fn status_error(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
    model: &str,
) -> HuginnError {
    let detail = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_default();

    let reason = match status.as_u16() {
        401 | 403 => "authentication failed".to_string(),
        404 => format!("model not found: {model}"),
        429 => match retry_after {
            Some(delay) => format!("rate limited, retry after {}s", delay.as_secs()),
            None => "rate limited".to_string(),
        },
        503 => "model is loading".to_string(),
        code => format!("inference API returned HTTP {code}"),
    };

    if detail.is_empty() {
        unavailable(reason)
    } else {
        unavailable(format!("{reason}: {detail}"))
    }
}

#[derive(Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [&'a str],
    hypothesis_template: &'a str,
    multi_label: bool,
}

/// The API has answered in both a column and a row layout over time.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Columns { labels: Vec<String>, scores: Vec<f32> },
    Rows(Vec<LabelScore>),
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f32,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: String,
}

impl ZeroShotResponse {
    fn into_scored(self) -> Result<Vec<ScoredCategory>> {
        match self {
            Self::Columns { labels, scores } => {
                if labels.len() != scores.len() {
                    return Err(unavailable(format!(
                        "response has {} labels but {} scores",
                        labels.len(),
                        scores.len()
                    )));
                }
                Ok(labels
                    .into_iter()
                    .zip(scores)
                    .map(|(label, score)| ScoredCategory::new(label, score))
                    .collect())
            }
            Self::Rows(rows) => Ok(rows
                .into_iter()
                .map(|row| ScoredCategory::new(row.label, row.score))
                .collect()),
        }
    }
}
