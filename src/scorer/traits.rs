//! Scorer traits.
//!
//! A scorer maps one text and a fixed list of candidate categories to a score
//! per category, ranked by the underlying mechanism. Two shapes exist:
//!
//! - [`CategoryScorer`]: async, `&self`, safe to call concurrently. This is
//!   what the classification service holds.
//! - [`LocalScorer`]: blocking, `&mut self`. Implementations that cannot be
//!   invoked concurrently (an ONNX session, for instance) implement this and
//!   are adapted with [`Serialized`](super::Serialized).
//!
//! Any failure to load or invoke the mechanism is reported as
//! `ScoringUnavailable` and is never retried here.

use async_trait::async_trait;
use serde::Deserialize;

use crate::Result;
use crate::types::{HypothesisTemplate, ScoredCategory};

/// How per-category entailment scores relate to each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Scores are normalized across categories and sum to 1.
    #[default]
    SingleLabel,
    /// Each category is scored independently.
    MultiLabel,
}

impl ScoringMode {
    pub fn is_multi_label(self) -> bool {
        matches!(self, Self::MultiLabel)
    }
}

/// Zero-shot category scorer.
#[async_trait]
pub trait CategoryScorer: Send + Sync {
    /// Scorer name for logging/debugging.
    fn name(&self) -> &str;

    /// Identifier of the underlying model, for logging and display only.
    fn model_id(&self) -> &str;

    /// Score `text` against every category, highest score first.
    ///
    /// `template` phrases each category as a hypothesis for the model.
    async fn score(
        &self,
        text: &str,
        categories: &[&str],
        template: &HypothesisTemplate,
    ) -> Result<Vec<ScoredCategory>>;
}

/// Blocking scorer that needs exclusive access while scoring.
pub trait LocalScorer: Send + 'static {
    fn name(&self) -> &str;

    fn model_id(&self) -> &str;

    fn score(
        &mut self,
        text: &str,
        categories: &[&str],
        template: &HypothesisTemplate,
    ) -> Result<Vec<ScoredCategory>>;
}
