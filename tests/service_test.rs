//! Behavioural tests for `ClassificationService` with mock scorers and sinks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use huginn::types::ScoredCategory;
use huginn::{
    CategoryScorer, CategorySet, ClassificationService, HuginnError, HypothesisTemplate,
    LogRecord, Result, TrackingSink,
};

// ============================================================================
// Mock scorers
// ============================================================================

/// Returns the same ranked scores for every text.
struct FixedScorer {
    scores: Vec<(&'static str, f32)>,
    calls: Arc<AtomicUsize>,
}

impl FixedScorer {
    fn new(scores: &[(&'static str, f32)]) -> Self {
        Self {
            scores: scores.to_vec(),
            calls: Arc::default(),
        }
    }
}

#[async_trait]
impl CategoryScorer for FixedScorer {
    fn name(&self) -> &str {
        "fixed"
    }

    fn model_id(&self) -> &str {
        "mock/fixed"
    }

    async fn score(
        &self,
        _text: &str,
        _categories: &[&str],
        _template: &HypothesisTemplate,
    ) -> Result<Vec<ScoredCategory>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .scores
            .iter()
            .map(|(c, s)| ScoredCategory::new(*c, *s))
            .collect())
    }
}

/// Scores depend on the text: the category named in the text wins.
/// Texts containing "boom" fail.
struct KeywordScorer {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl CategoryScorer for KeywordScorer {
    fn name(&self) -> &str {
        "keyword"
    }

    fn model_id(&self) -> &str {
        "mock/keyword"
    }

    async fn score(
        &self,
        text: &str,
        categories: &[&str],
        template: &HypothesisTemplate,
    ) -> Result<Vec<ScoredCategory>> {
        self.seen.lock().unwrap().push(text.to_string());
        if text.contains("boom") {
            return Err(HuginnError::ScoringUnavailable("model crashed".into()));
        }

        let weights: HashMap<&str, f32> = categories
            .iter()
            .map(|c| {
                let hypothesis = template.render(c);
                let hit = text.contains(*c) && hypothesis.contains(*c);
                (*c, if hit { 3.0 } else { 1.0 })
            })
            .collect();
        let total: f32 = weights.values().sum();

        let mut scored: Vec<ScoredCategory> = categories
            .iter()
            .map(|c| ScoredCategory::new(*c, weights[c] / total))
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(scored)
    }
}

// ============================================================================
// Mock sinks
// ============================================================================

#[derive(Default)]
struct RecordingSink {
    records: Mutex<Vec<LogRecord>>,
}

#[async_trait]
impl TrackingSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn record(&self, record: &LogRecord) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl TrackingSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn record(&self, _record: &LogRecord) -> Result<()> {
        Err(HuginnError::sink("failing", "tracking server unreachable"))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn three_categories() -> CategorySet {
    CategorySet::new(["Product Quality", "Delivery Issues", "Customer Service"]).unwrap()
}

fn keyword_service(concurrency: usize) -> (ClassificationService, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let service = ClassificationService::builder()
        .scorer(KeywordScorer {
            seen: Arc::clone(&seen),
        })
        .categories(three_categories())
        .batch_concurrency(concurrency)
        .build()
        .unwrap();
    (service, seen)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn product_quality_scenario() {
    let service = ClassificationService::builder()
        .scorer(FixedScorer::new(&[
            ("Product Quality", 0.6),
            ("Delivery Issues", 0.5),
            ("Customer Service", 0.3),
        ]))
        .categories(three_categories())
        .build()
        .unwrap();

    let result = service
        .classify("It arrived broken and support never responded")
        .await
        .unwrap();

    assert_eq!(result.top_category, "Product Quality");
    assert_eq!(result.top_score, 0.6);
}

#[tokio::test]
async fn scores_cover_exactly_the_category_set() {
    let (service, _) = keyword_service(1);

    for text in ["Delivery Issues again", "", "nothing relevant at all"] {
        let result = service.classify(text).await.unwrap();

        let mut keys: Vec<&str> = result.scores.categories().collect();
        keys.sort_unstable();
        let mut expected = service.categories().as_strs();
        expected.sort_unstable();
        assert_eq!(keys, expected);

        assert!(result.scores.iter().all(|(_, s)| (0.0..=1.0).contains(&s)));
        assert_eq!(result.scores.get(&result.top_category), Some(result.top_score));
    }
}

#[tokio::test]
async fn top_category_is_argmax_not_first_entry() {
    // Scorer violates its own descending order.
    let service = ClassificationService::builder()
        .scorer(FixedScorer::new(&[
            ("Customer Service", 0.2),
            ("Delivery Issues", 0.7),
            ("Product Quality", 0.1),
        ]))
        .categories(three_categories())
        .build()
        .unwrap();

    let result = service.classify("late").await.unwrap();
    assert_eq!(result.top_category, "Delivery Issues");
}

#[tokio::test]
async fn tie_resolves_to_scorer_first() {
    let service = ClassificationService::builder()
        .scorer(FixedScorer::new(&[
            ("Customer Service", 0.4),
            ("Product Quality", 0.4),
            ("Delivery Issues", 0.2),
        ]))
        .categories(three_categories())
        .build()
        .unwrap();

    let result = service.classify("meh").await.unwrap();
    assert_eq!(result.top_category, "Customer Service");
    assert_eq!(result.top_score, 0.4);
}

#[tokio::test]
async fn malformed_scorer_output_is_scoring_unavailable() {
    let service = ClassificationService::builder()
        .scorer(FixedScorer::new(&[("Product Quality", 1.0)]))
        .categories(three_categories())
        .build()
        .unwrap();

    let err = service.classify("x").await.unwrap_err();
    assert!(matches!(err, HuginnError::ScoringUnavailable(_)));
}

#[tokio::test]
async fn batch_matches_independent_calls() {
    let texts = vec![
        "Customer Service ignored me".to_string(),
        "Delivery Issues all week".to_string(),
        String::new(),
        "Product Quality is poor".to_string(),
    ];

    for concurrency in [1, 3] {
        let (service, _) = keyword_service(concurrency);
        let batch = service.classify_batch(texts.as_slice()).await.unwrap();

        assert_eq!(batch.len(), texts.len());
        for (text, result) in texts.iter().zip(&batch) {
            assert_eq!(result, &service.classify(text).await.unwrap());
        }
    }
}

#[tokio::test]
async fn empty_batch_is_empty() {
    let (service, seen) = keyword_service(1);
    let batch = service.classify_batch::<String>(&[]).await.unwrap();
    assert!(batch.is_empty());
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn item_failure_fails_whole_batch() {
    let (service, _) = keyword_service(1);
    let texts = ["Product Quality", "boom", "Delivery Issues"];

    let outcome = service.classify_batch(&texts).await;
    assert!(matches!(outcome, Err(HuginnError::ScoringUnavailable(_))));
}

#[tokio::test]
async fn failing_sink_does_not_change_result() {
    let recording = Arc::new(RecordingSink::default());
    let scorer = FixedScorer::new(&[
        ("Product Quality", 0.6),
        ("Delivery Issues", 0.5),
        ("Customer Service", 0.3),
    ]);

    let plain = ClassificationService::builder()
        .scorer(FixedScorer::new(&scorer.scores))
        .categories(three_categories())
        .build()
        .unwrap();
    let tracked = ClassificationService::builder()
        .scorer(scorer)
        .categories(three_categories())
        .sink(FailingSink)
        .shared_sink(Arc::clone(&recording) as Arc<dyn TrackingSink>)
        .build()
        .unwrap();

    let expected = plain.classify("broken").await.unwrap();
    let result = tracked.classify_and_record("broken").await.unwrap();

    assert_eq!(result, expected);
    let records = recording.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].review, "broken");
    assert_eq!(records[0].predicted_category, "Product Quality");
    assert_eq!(records[0].model_id, "mock/fixed");
}

#[tokio::test]
async fn classify_and_record_scores_once() {
    let scorer = FixedScorer::new(&[
        ("Product Quality", 0.6),
        ("Delivery Issues", 0.5),
        ("Customer Service", 0.3),
    ]);
    let calls = Arc::clone(&scorer.calls);
    let recording = Arc::new(RecordingSink::default());
    let service = ClassificationService::builder()
        .scorer(scorer)
        .categories(three_categories())
        .shared_sink(Arc::clone(&recording) as Arc<dyn TrackingSink>)
        .build()
        .unwrap();

    service.classify_and_record("broken").await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(recording.records.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn batch_logging_reuses_results() {
    let recording = Arc::new(RecordingSink::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let service = ClassificationService::builder()
        .scorer(KeywordScorer {
            seen: Arc::clone(&seen),
        })
        .categories(three_categories())
        .shared_sink(Arc::clone(&recording) as Arc<dyn TrackingSink>)
        .build()
        .unwrap();
    let texts = ["Delivery Issues", "Customer Service"];

    let quiet = service.classify_batch_and_record(&texts, false).await.unwrap();
    assert!(recording.records.lock().unwrap().is_empty());

    let logged = service.classify_batch_and_record(&texts, true).await.unwrap();
    assert_eq!(quiet, logged);
    assert_eq!(seen.lock().unwrap().len(), 4);

    let records = recording.records.lock().unwrap();
    let predicted: Vec<&str> = records
        .iter()
        .map(|r| r.predicted_category.as_str())
        .collect();
    assert_eq!(predicted, vec!["Delivery Issues", "Customer Service"]);
}

#[tokio::test]
async fn scorer_receives_categories_and_template() {
    struct Inspecting(Arc<Mutex<Option<(Vec<String>, String)>>>);

    #[async_trait]
    impl CategoryScorer for Inspecting {
        fn name(&self) -> &str {
            "inspecting"
        }

        fn model_id(&self) -> &str {
            "mock/inspecting"
        }

        async fn score(
            &self,
            _text: &str,
            categories: &[&str],
            template: &HypothesisTemplate,
        ) -> Result<Vec<ScoredCategory>> {
            *self.0.lock().unwrap() = Some((
                categories.iter().map(|c| c.to_string()).collect(),
                template.as_str().to_string(),
            ));
            Ok(categories
                .iter()
                .map(|c| ScoredCategory::new(*c, 0.5))
                .collect())
        }
    }

    let captured = Arc::new(Mutex::new(None));
    let service = ClassificationService::builder()
        .scorer(Inspecting(Arc::clone(&captured)))
        .template(HypothesisTemplate::new("The customer is upset about {}.").unwrap())
        .build()
        .unwrap();

    service.classify("whatever").await.unwrap();

    let (categories, template) = captured.lock().unwrap().clone().unwrap();
    assert_eq!(categories.len(), 8);
    assert_eq!(categories[0], "Product Quality");
    assert_eq!(template, "The customer is upset about {}.");
}

#[test]
fn builder_requires_scorer_and_positive_concurrency() {
    let err = ClassificationService::builder().build().unwrap_err();
    assert!(matches!(err, HuginnError::Configuration(_)));

    let err = ClassificationService::builder()
        .scorer(FixedScorer::new(&[]))
        .batch_concurrency(0)
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("batch_concurrency"));
}

#[tokio::test]
async fn service_is_shareable_across_tasks() {
    let (service, _) = keyword_service(2);
    let service = Arc::new(service);

    let handles: Vec<_> = ["Delivery Issues", "Product Quality", "Customer Service"]
        .into_iter()
        .map(|text| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.classify(text).await })
        })
        .collect();

    for (handle, expected) in handles
        .into_iter()
        .zip(["Delivery Issues", "Product Quality", "Customer Service"])
    {
        assert_eq!(handle.await.unwrap().unwrap().top_category, expected);
    }
}

#[tokio::test]
async fn batch_runs_inside_spawned_task() {
    let (service, _) = keyword_service(2);
    let service = Arc::new(service);
    let texts = vec![
        "Delivery Issues".to_string(),
        "Product Quality".to_string(),
        "Customer Service".to_string(),
    ];

    let batch = tokio::spawn(async move { service.classify_batch(texts.as_slice()).await })
        .await
        .unwrap()
        .unwrap();

    let categories: Vec<&str> = batch.iter().map(|r| r.top_category.as_str()).collect();
    assert_eq!(
        categories,
        vec!["Delivery Issues", "Product Quality", "Customer Service"]
    );
}
