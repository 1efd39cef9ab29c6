//! Builder for classification services

use std::sync::Arc;

use super::ClassificationService;
use crate::scorer::CategoryScorer;
use crate::sinks::{SinkSet, TrackingSink};
use crate::types::{CategorySet, HypothesisTemplate};
use crate::{HuginnError, Result};

/// Builder for [`ClassificationService`].
///
/// Only the scorer is required; categories and template default to the
/// review taxonomy and `"This review is about {}"`.
pub struct ClassifierBuilder {
    scorer: Option<Arc<dyn CategoryScorer>>,
    categories: CategorySet,
    template: HypothesisTemplate,
    sinks: SinkSet,
    batch_concurrency: usize,
}

impl ClassifierBuilder {
    pub fn new() -> Self {
        Self {
            scorer: None,
            categories: CategorySet::default(),
            template: HypothesisTemplate::default(),
            sinks: SinkSet::new(),
            batch_concurrency: 1,
        }
    }

    /// Set the scorer.
    pub fn scorer(self, scorer: impl CategoryScorer + 'static) -> Self {
        self.shared_scorer(Arc::new(scorer))
    }

    /// Set an already shared scorer.
    pub fn shared_scorer(mut self, scorer: Arc<dyn CategoryScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn categories(mut self, categories: CategorySet) -> Self {
        self.categories = categories;
        self
    }

    pub fn template(mut self, template: HypothesisTemplate) -> Self {
        self.template = template;
        self
    }

    /// Add a tracking sink. Sinks receive records in registration order.
    pub fn sink(self, sink: impl TrackingSink + 'static) -> Self {
        self.shared_sink(Arc::new(sink))
    }

    pub fn shared_sink(mut self, sink: Arc<dyn TrackingSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Maximum texts of one batch scored at the same time (default: 1).
    pub fn batch_concurrency(mut self, n: usize) -> Self {
        self.batch_concurrency = n;
        self
    }

    /// Build the service.
    pub fn build(self) -> Result<ClassificationService> {
        let scorer = self
            .scorer
            .ok_or_else(|| HuginnError::Configuration("no scorer configured".to_string()))?;
        if self.batch_concurrency == 0 {
            return Err(HuginnError::Configuration(
                "batch_concurrency must be at least 1".to_string(),
            ));
        }

        Ok(ClassificationService {
            scorer,
            categories: self.categories,
            template: self.template,
            sinks: self.sinks,
            batch_concurrency: self.batch_concurrency,
        })
    }
}

impl Default for ClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}
