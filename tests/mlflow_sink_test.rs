//! Wiremock tests for the MLflow tracking sink.

use std::time::Duration;

use huginn::sinks::{Experiment, MlflowSink, ReadinessProbe};
use huginn::types::ScoredCategory;
use huginn::{ClassificationResult, HuginnError, LogRecord, TrackingSink};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API: &str = "/api/2.0/mlflow";

fn record(review: &str) -> LogRecord {
    let result = ClassificationResult {
        top_category: "Delivery Issues".into(),
        top_score: 0.75,
        scores: [
            ScoredCategory::new("Delivery Issues", 0.75),
            ScoredCategory::new("Others", 0.25),
        ]
        .into_iter()
        .collect(),
    };
    LogRecord::new(review, &result, "facebook/bart-large-mnli")
}

async fn mount_run_endpoints(server: &MockServer, experiment_id: &str, runs: u64) {
    Mock::given(method("POST"))
        .and(path(format!("{API}/runs/create")))
        .and(body_partial_json(serde_json::json!({ "experiment_id": experiment_id })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "run": { "info": { "run_id": "run-1", "experiment_id": experiment_id } }
        })))
        .expect(runs)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/runs/log-batch")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(runs)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/runs/update")))
        .and(body_partial_json(
            serde_json::json!({ "run_id": "run-1", "status": "FINISHED" }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(runs)
        .mount(server)
        .await;
}

#[tokio::test]
async fn record_creates_logs_and_finishes_a_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/runs/create")))
        .and(header("Authorization", "Bearer secret"))
        .and(body_partial_json(serde_json::json!({ "experiment_id": "0" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "run": { "info": { "run_id": "run-1" } }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/runs/log-batch")))
        .and(body_partial_json(serde_json::json!({
            "run_id": "run-1",
            "params": [
                { "key": "model_name", "value": "facebook/bart-large-mnli" },
                { "key": "review", "value": "Parcel came a week late" }
            ],
            "metrics": [
                { "key": "confidence", "value": 0.75, "step": 0 },
                { "key": "score_Delivery_Issues", "value": 0.75 },
                { "key": "score_Others", "value": 0.25 }
            ],
            "tags": [{ "key": "predicted_category", "value": "Delivery Issues" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/runs/update")))
        .and(body_partial_json(
            serde_json::json!({ "run_id": "run-1", "status": "FINISHED" }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let sink = MlflowSink::new(server.uri(), Experiment::default())
        .unwrap()
        .token("secret");
    sink.record(&record("Parcel came a week late")).await.unwrap();
}

#[tokio::test]
async fn long_reviews_are_truncated_in_params() {
    let server = MockServer::start().await;
    let review = "é".repeat(800);
    let truncated = "é".repeat(500);

    Mock::given(method("POST"))
        .and(path(format!("{API}/runs/create")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "run": { "info": { "run_id": "run-1" } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/runs/log-batch")))
        .and(body_partial_json(serde_json::json!({
            "params": [
                { "key": "model_name" },
                { "key": "review", "value": truncated }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/runs/update")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let sink = MlflowSink::new(server.uri(), Experiment::default()).unwrap();
    sink.record(&record(&review)).await.unwrap();
}

#[tokio::test]
async fn named_experiment_is_created_once_when_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/experiments/get-by-name")))
        .and(query_param("experiment_name", "review-triage"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error_code": "RESOURCE_DOES_NOT_EXIST",
            "message": "Could not find experiment with name 'review-triage'"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/experiments/create")))
        .and(body_partial_json(serde_json::json!({ "name": "review-triage" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "experiment_id": "42" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_run_endpoints(&server, "42", 2).await;

    let sink = MlflowSink::new(server.uri(), Experiment::Name("review-triage".into())).unwrap();
    sink.record(&record("late")).await.unwrap();
    sink.record(&record("late again")).await.unwrap();
}

#[tokio::test]
async fn named_experiment_is_looked_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/experiments/get-by-name")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "experiment": { "experiment_id": "7", "name": "review-triage" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/experiments/create")))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    mount_run_endpoints(&server, "7", 1).await;

    let sink = MlflowSink::new(server.uri(), Experiment::Name("review-triage".into())).unwrap();
    sink.record(&record("late")).await.unwrap();
}

#[tokio::test]
async fn server_errors_are_sink_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/runs/create")))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error_code": "INTERNAL_ERROR",
            "message": "database is locked"
        })))
        .mount(&server)
        .await;

    let sink = MlflowSink::new(server.uri(), Experiment::default()).unwrap();
    let err = sink.record(&record("late")).await.unwrap_err();

    match &err {
        HuginnError::LoggingSinkFailure { sink, message } => {
            assert_eq!(sink, "mlflow");
            assert!(message.contains("create run"), "{message}");
            assert!(message.contains("database is locked"), "{message}");
        }
        other => panic!("expected LoggingSinkFailure, got {other:?}"),
    }
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn failed_log_batch_ends_the_run_as_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/runs/create")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "run": { "info": { "run_id": "run-1", "experiment_id": "0" } }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/runs/log-batch")))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error_code": "INTERNAL_ERROR",
            "message": "metric store unavailable"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/runs/update")))
        .and(body_partial_json(
            serde_json::json!({ "run_id": "run-1", "status": "FAILED" }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/runs/update")))
        .and(body_partial_json(serde_json::json!({ "status": "FINISHED" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let sink = MlflowSink::new(server.uri(), Experiment::default()).unwrap();
    let err = sink.record(&record("late")).await.unwrap_err();

    match &err {
        HuginnError::LoggingSinkFailure { message, .. } => {
            assert!(message.contains("log batch"), "{message}");
            assert!(message.contains("metric store unavailable"), "{message}");
        }
        other => panic!("expected LoggingSinkFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_run_close_keeps_the_log_batch_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/runs/create")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "run": { "info": { "run_id": "run-1", "experiment_id": "0" } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/runs/log-batch")))
        .respond_with(ResponseTemplate::new(500).set_body_string("log-batch down"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/runs/update")))
        .respond_with(ResponseTemplate::new(500).set_body_string("update down"))
        .expect(1)
        .mount(&server)
        .await;

    let sink = MlflowSink::new(server.uri(), Experiment::default()).unwrap();
    let err = sink.record(&record("late")).await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("log batch"), "{message}");
    assert!(!message.contains("update down"), "{message}");
}

#[tokio::test]
async fn unreachable_server_is_a_sink_failure() {
    // Nothing listens on the discard port.
    let sink = MlflowSink::new("http://127.0.0.1:9", Experiment::default()).unwrap();
    let err = sink.record(&record("late")).await.unwrap_err();
    assert!(matches!(err, HuginnError::LoggingSinkFailure { .. }));
}

#[tokio::test]
async fn wait_ready_succeeds_once_health_answers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let sink = MlflowSink::new(server.uri(), Experiment::default()).unwrap();
    let probe = ReadinessProbe::new()
        .initial_delay(Duration::from_millis(10))
        .deadline(Duration::from_secs(5));
    assert!(sink.wait_ready(&probe).await);
}

#[tokio::test]
async fn wait_ready_gives_up_at_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let sink = MlflowSink::new(server.uri(), Experiment::default()).unwrap();
    let probe = ReadinessProbe::new()
        .initial_delay(Duration::from_millis(10))
        .deadline(Duration::from_millis(100));
    assert!(!sink.wait_ready(&probe).await);
}
