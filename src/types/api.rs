//! HTTP request and response bodies shared by `huginnd` and `huginn`.

use serde::{Deserialize, Serialize};

use super::result::{ClassificationResult, ScoreDistribution};

/// `POST /classify` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub text: String,
}

/// `POST /batch-classify` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchClassifyRequest {
    pub reviews: Vec<String>,
    #[serde(default)]
    pub log_results: bool,
}

/// `POST /classify` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResponse {
    pub category: String,
    pub confidence: f32,
    pub all_scores: ScoreDistribution,
}

impl From<ClassificationResult> for ClassificationResponse {
    fn from(result: ClassificationResult) -> Self {
        Self {
            category: result.top_category,
            confidence: result.top_score,
            all_scores: result.scores,
        }
    }
}

impl From<ClassificationResponse> for ClassificationResult {
    fn from(response: ClassificationResponse) -> Self {
        Self {
            top_category: response.category,
            top_score: response.confidence,
            scores: response.all_scores,
        }
    }
}

/// `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model_id: String,
    pub categories: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_results_defaults_to_false() {
        let req: BatchClassifyRequest =
            serde_json::from_str(r#"{"reviews": ["a", "b"]}"#).unwrap();
        assert_eq!(req.reviews.len(), 2);
        assert!(!req.log_results);
    }

    #[test]
    fn batch_request_rejects_non_string_reviews() {
        assert!(serde_json::from_str::<BatchClassifyRequest>(r#"{"reviews": [1, 2]}"#).is_err());
        assert!(serde_json::from_str::<BatchClassifyRequest>(r#"{"reviews": "x"}"#).is_err());
    }
}
