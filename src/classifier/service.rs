//! The classification service.

use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, instrument, warn};

use super::builder::ClassifierBuilder;
use super::normalize::normalize;
use crate::Result;
use crate::scorer::CategoryScorer;
use crate::sinks::SinkSet;
use crate::telemetry;
use crate::types::{BatchResult, CategorySet, ClassificationResult, HypothesisTemplate, LogRecord};

/// Classifies review texts against a fixed category set.
///
/// Holds no per-call state; share it behind an `Arc` to serve concurrent
/// callers.
pub struct ClassificationService {
    pub(super) scorer: Arc<dyn CategoryScorer>,
    pub(super) categories: CategorySet,
    pub(super) template: HypothesisTemplate,
    pub(super) sinks: SinkSet,
    pub(super) batch_concurrency: usize,
}

impl ClassificationService {
    pub fn builder() -> ClassifierBuilder {
        ClassifierBuilder::new()
    }

    /// Identifier of the scorer's model, for display and tracking.
    pub fn model_id(&self) -> &str {
        self.scorer.model_id()
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    pub fn template(&self) -> &HypothesisTemplate {
        &self.template
    }

    pub fn sinks(&self) -> &SinkSet {
        &self.sinks
    }

    /// Classify one text.
    ///
    /// Empty text is passed to the scorer as is.
    #[instrument(skip_all, fields(scorer = self.scorer.name(), text_len = text.len()))]
    pub async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let start = Instant::now();
        let labels = self.categories.as_strs();

        let outcome = match self.scorer.score(text, &labels, &self.template).await {
            Ok(scored) => normalize(scored, &self.categories),
            Err(e) => Err(e),
        };
        self.record_outcome(start, &outcome);

        match &outcome {
            Ok(result) => debug!(
                top_category = %result.top_category,
                top_score = result.top_score,
                "classified"
            ),
            Err(e) => warn!(error = %e, "classification failed"),
        }
        outcome
    }

    /// Classify every text, results index-aligned with the input.
    ///
    /// The first failing item fails the whole batch.
    #[instrument(skip_all, fields(batch_size = texts.len()))]
    pub async fn classify_batch<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Result<BatchResult> {
        metrics::histogram!(telemetry::BATCH_SIZE).record(texts.len() as f64);
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Built eagerly: a borrowing `map` closure would make the stream non-`Send`.
        let pending: Vec<_> = texts.iter().map(|text| self.classify(text.as_ref())).collect();
        stream::iter(pending)
            .buffered(self.batch_concurrency)
            .try_collect()
            .await
    }

    /// Hand an already computed result to every sink. Never fails.
    pub async fn record(&self, text: &str, result: &ClassificationResult) {
        if self.sinks.is_empty() {
            return;
        }
        let record = LogRecord::new(text, result, self.model_id());
        let failures = self.sinks.record(&record).await;
        if !failures.is_empty() {
            debug!(failed = failures.len(), "some sinks did not record");
        }
    }

    /// Classify `text` and record the result.
    pub async fn classify_and_record(&self, text: &str) -> Result<ClassificationResult> {
        let result = self.classify(text).await?;
        self.record(text, &result).await;
        Ok(result)
    }

    /// Classify a batch and, when `log_requested`, record each pair from the
    /// computed results.
    pub async fn classify_batch_and_record<S: AsRef<str> + Sync>(
        &self,
        texts: &[S],
        log_requested: bool,
    ) -> Result<BatchResult> {
        let results = self.classify_batch(texts).await?;
        if log_requested {
            for (text, result) in texts.iter().zip(&results) {
                self.record(text.as_ref(), result).await;
            }
        }
        Ok(results)
    }

    fn record_outcome(&self, start: Instant, outcome: &Result<ClassificationResult>) {
        let status = if outcome.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::CLASSIFICATIONS_TOTAL, "status" => status).increment(1);
        metrics::histogram!(telemetry::CLASSIFY_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());
        if let Ok(result) = outcome {
            metrics::counter!(telemetry::PREDICTED_CATEGORY_TOTAL,
                "category" => result.top_category.clone(),
            )
            .increment(1);
        }
    }
}

impl std::fmt::Debug for ClassificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationService")
            .field("scorer", &self.scorer.name())
            .field("model_id", &self.model_id())
            .field("categories", &self.categories)
            .field("template", &self.template)
            .field("sinks", &self.sinks)
            .field("batch_concurrency", &self.batch_concurrency)
            .finish()
    }
}
