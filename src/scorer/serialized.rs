//! Exclusive-access adapter for blocking scorers.
//!
//! Wraps a [`LocalScorer`] behind a single mutex and runs each call on the
//! blocking thread pool, so at most one scoring call touches the underlying
//! mechanism at a time while async callers stay unblocked.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::error;

use super::traits::{CategoryScorer, LocalScorer};
use crate::types::{HypothesisTemplate, ScoredCategory};
use crate::{HuginnError, Result};

/// [`CategoryScorer`] over a [`LocalScorer`] that serializes all calls.
pub struct Serialized<S: LocalScorer> {
    inner: Arc<Mutex<S>>,
    name: String,
    model_id: String,
}

impl<S: LocalScorer> Serialized<S> {
    pub fn new(scorer: S) -> Self {
        Self {
            name: scorer.name().to_string(),
            model_id: scorer.model_id().to_string(),
            inner: Arc::new(Mutex::new(scorer)),
        }
    }
}

#[async_trait]
impl<S: LocalScorer> CategoryScorer for Serialized<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn score(
        &self,
        text: &str,
        categories: &[&str],
        template: &HypothesisTemplate,
    ) -> Result<Vec<ScoredCategory>> {
        let inner = Arc::clone(&self.inner);
        let text = text.to_owned();
        let categories: Vec<String> = categories.iter().map(|c| c.to_string()).collect();
        let template = template.clone();

        let joined = tokio::task::spawn_blocking(move || {
            let mut scorer = inner.lock().map_err(|_| {
                HuginnError::ScoringUnavailable(
                    "scorer is unusable after an earlier panic".to_string(),
                )
            })?;
            let labels: Vec<&str> = categories.iter().map(String::as_str).collect();
            scorer.score(&text, &labels, &template)
        })
        .await;

        joined.unwrap_or_else(|e| {
            error!(scorer = %self.name, error = %e, "scoring task failed");
            Err(HuginnError::ScoringUnavailable(format!(
                "scoring task failed: {e}"
            )))
        })
    }
}
