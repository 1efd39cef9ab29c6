//! Sink that writes records as structured `tracing` events.

use async_trait::async_trait;
use tracing::info;

use super::traits::TrackingSink;
use crate::Result;
use crate::types::LogRecord;

/// Emits every record at `info` under the `huginn::tracking` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl TrackingSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn record(&self, record: &LogRecord) -> Result<()> {
        let scores = serde_json::to_string(&record.category_scores)?;
        info!(
            target: "huginn::tracking",
            model = %record.model_id,
            predicted_category = %record.predicted_category,
            confidence = record.confidence,
            scores = %scores,
            review_chars = record.review.chars().count(),
            "classification recorded"
        );
        Ok(())
    }
}
