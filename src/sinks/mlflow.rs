//! MLflow tracking sink over the REST API.
//!
//! Every record becomes one finished run holding the model and review as
//! params, the confidence and per-category scores as metrics, and the
//! predicted category as a tag. A run whose data could not be logged is
//! ended as FAILED. See:
//! <https://mlflow.org/docs/latest/rest-api.html>

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::readiness::ReadinessProbe;
use super::traits::TrackingSink;
use crate::types::LogRecord;
use crate::{HuginnError, Result};

const SINK_NAME: &str = "mlflow";

/// MLflow rejects param values longer than this.
pub const MAX_PARAM_VALUE_CHARS: usize = 500;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Which experiment runs are created in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Experiment {
    /// Existing experiment id ("0" is MLflow's default experiment).
    Id(String),
    /// Experiment name, created on first use if missing.
    Name(String),
}

impl Default for Experiment {
    fn default() -> Self {
        Self::Id("0".to_string())
    }
}

/// Tracking sink for an MLflow tracking server.
pub struct MlflowSink {
    http: Client,
    tracking_uri: String,
    token: Option<String>,
    experiment: Experiment,
    experiment_id: OnceCell<String>,
}

impl MlflowSink {
    /// Create a sink for the server at `tracking_uri` (e.g. `http://127.0.0.1:5000`).
    pub fn new(tracking_uri: impl Into<String>, experiment: Experiment) -> Result<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(crate::user_agent())
            .build()
            .map_err(|e| HuginnError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            tracking_uri: tracking_uri.into().trim_end_matches('/').to_string(),
            token: None,
            experiment,
            experiment_id: OnceCell::new(),
        })
    }

    /// Authenticate with a bearer token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn tracking_uri(&self) -> &str {
        &self.tracking_uri
    }

    /// Poll `GET /health` until the server answers or `probe` gives up.
    pub async fn wait_ready(&self, probe: &ReadinessProbe) -> bool {
        let url = format!("{}/health", self.tracking_uri);
        let (http, url) = (&self.http, url.as_str());
        let ready = probe
            .wait(|| async move {
                match http.get(url).send().await {
                    Ok(response) => response.status().is_success(),
                    Err(e) => {
                        debug!(error = %e, "MLflow health check failed");
                        false
                    }
                }
            })
            .await;
        if ready {
            info!(tracking_uri = %self.tracking_uri, "MLflow tracking server ready");
        }
        ready
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/2.0/mlflow/{path}", self.tracking_uri)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| HuginnError::sink(SINK_NAME, format!("{what}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(what, status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| HuginnError::sink(SINK_NAME, format!("{what}: undecodable response: {e}")))
    }

    /// Move a run to a terminal status.
    async fn end_run(&self, run_id: &str, status: &str) -> Result<()> {
        let update = self.http.post(self.endpoint("runs/update")).json(&json!({
            "run_id": run_id,
            "status": status,
            "end_time": now_millis(),
        }));
        self.send::<serde_json::Value>(update, "end run").await?;
        Ok(())
    }

    async fn experiment_id(&self) -> Result<&str> {
        self.experiment_id
            .get_or_try_init(|| self.resolve_experiment())
            .await
            .map(String::as_str)
    }

    async fn resolve_experiment(&self) -> Result<String> {
        let name = match &self.experiment {
            Experiment::Id(id) => return Ok(id.clone()),
            Experiment::Name(name) => name,
        };

        let lookup = self
            .http
            .get(self.endpoint("experiments/get-by-name"))
            .query(&[("experiment_name", name)]);
        match self
            .send::<GetExperimentResponse>(lookup, "get experiment")
            .await
        {
            Ok(found) => return Ok(found.experiment.experiment_id),
            Err(e) if !is_missing_resource(&e) => return Err(e),
            Err(_) => {}
        }

        let create = self
            .http
            .post(self.endpoint("experiments/create"))
            .json(&json!({ "name": name }));
        let created: CreateExperimentResponse = self.send(create, "create experiment").await?;
        info!(experiment = %name, id = %created.experiment_id, "created MLflow experiment");
        Ok(created.experiment_id)
    }
}

#[async_trait]
impl TrackingSink for MlflowSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    async fn record(&self, record: &LogRecord) -> Result<()> {
        let experiment_id = self.experiment_id().await?;
        let now = now_millis();

        let create = self.http.post(self.endpoint("runs/create")).json(&json!({
            "experiment_id": experiment_id,
            "start_time": now,
            "run_name": format!("classify-{now}"),
        }));
        let created: CreateRunResponse = self.send(create, "create run").await?;
        let run_id = created.run.info.run_id;

        let batch = self
            .http
            .post(self.endpoint("runs/log-batch"))
            .json(&log_batch(&run_id, record, now));
        if let Err(e) = self.send::<serde_json::Value>(batch, "log batch").await {
            if let Err(close) = self.end_run(&run_id, "FAILED").await {
                warn!(run_id = %run_id, error = %close, "could not mark MLflow run as failed");
            }
            return Err(e);
        }

        self.end_run(&run_id, "FINISHED").await?;

        debug!(run_id = %run_id, "MLflow run logged");
        Ok(())
    }
}

/// Body of `runs/log-batch` for one record.
fn log_batch(run_id: &str, record: &LogRecord, timestamp: u64) -> LogBatchRequest {
    let metric = |key: String, value: f32| Metric {
        key,
        value: f64::from(value),
        timestamp,
        step: 0,
    };

    let mut metrics = vec![metric("confidence".to_string(), record.confidence)];
    metrics.extend(
        record
            .category_scores
            .iter()
            .map(|(category, score)| metric(score_metric_key(category), score)),
    );

    LogBatchRequest {
        run_id: run_id.to_string(),
        params: vec![
            KeyValue::new("model_name", &record.model_id),
            KeyValue::new("review", truncate_chars(&record.review, MAX_PARAM_VALUE_CHARS)),
        ],
        metrics,
        tags: vec![KeyValue::new("predicted_category", &record.predicted_category)],
    }
}

/// `score_` followed by the category with spaces replaced by underscores.
pub fn score_metric_key(category: &str) -> String {
    format!("score_{}", category.replace(' ', "_"))
}

fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

fn api_error(what: &str, status: StatusCode, body: &str) -> HuginnError {
    let detail = serde_json::from_str::<MlflowErrorBody>(body).unwrap_or_default();
    let message = match (detail.error_code.is_empty(), detail.message.is_empty()) {
        (true, _) => format!("{what}: HTTP {}", status.as_u16()),
        (false, true) => format!("{what}: HTTP {} {}", status.as_u16(), detail.error_code),
        (false, false) => format!(
            "{what}: HTTP {} {}: {}",
            status.as_u16(),
            detail.error_code,
            detail.message
        ),
    };
    HuginnError::sink(SINK_NAME, message)
}

fn is_missing_resource(err: &HuginnError) -> bool {
    matches!(err, HuginnError::LoggingSinkFailure { message, .. }
        if message.contains("RESOURCE_DOES_NOT_EXIST") || message.contains("HTTP 404"))
}

#[derive(Serialize)]
struct LogBatchRequest {
    run_id: String,
    params: Vec<KeyValue>,
    metrics: Vec<Metric>,
    tags: Vec<KeyValue>,
}

#[derive(Serialize)]
struct KeyValue {
    key: String,
    value: String,
}

impl KeyValue {
    fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Serialize)]
struct Metric {
    key: String,
    value: f64,
    timestamp: u64,
    step: u64,
}

#[derive(Deserialize)]
struct CreateRunResponse {
    run: Run,
}

#[derive(Deserialize)]
struct Run {
    info: RunInfo,
}

#[derive(Deserialize)]
struct RunInfo {
    run_id: String,
}

#[derive(Deserialize)]
struct GetExperimentResponse {
    experiment: ExperimentInfo,
}

#[derive(Deserialize)]
struct ExperimentInfo {
    experiment_id: String,
}

#[derive(Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct MlflowErrorBody {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}
