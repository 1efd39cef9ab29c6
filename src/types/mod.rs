//! Public types for the Huginn API.

mod api;
mod category;
mod record;
mod result;

pub use api::{BatchClassifyRequest, ClassificationResponse, ClassifyRequest, HealthResponse};
pub use category::{CategorySet, DEFAULT_CATEGORIES, DEFAULT_HYPOTHESIS_TEMPLATE, HypothesisTemplate};
pub use record::LogRecord;
pub use result::{BatchResult, ClassificationResult, ScoreDistribution, ScoredCategory};
