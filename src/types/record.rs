//! Tracking record handed to logging sinks.

use serde::Serialize;

use super::result::{ClassificationResult, ScoreDistribution};

/// Write-only projection of one classification for tracking sinks.
///
/// Built from an already-computed result; never retained by the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub review: String,
    pub predicted_category: String,
    pub confidence: f32,
    pub category_scores: ScoreDistribution,
    pub model_id: String,
}

impl LogRecord {
    pub fn new(review: &str, result: &ClassificationResult, model_id: &str) -> Self {
        Self {
            review: review.to_string(),
            predicted_category: result.top_category.clone(),
            confidence: result.top_score,
            category_scores: result.scores.clone(),
            model_id: model_id.to_string(),
        }
    }
}
