//! HTTP routes for huginnd.
//!
//! - `POST /classify`: classify one review and record it to the sinks
//! - `POST /batch-classify`: classify many reviews, recording only on request
//!
//! The request deadline covers scoring only. Recording happens on a detached
//! task after the response is decided.
//! - `GET /health`: version, model and categories

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower::limit::ConcurrencyLimitLayer;
use tracing::debug;

use super::config::LimitsConfig;
use super::error::ApiError;
use crate::classifier::ClassificationService;
use crate::types::{
    BatchClassifyRequest, BatchResult, ClassificationResponse, ClassificationResult,
    ClassifyRequest, HealthResponse,
};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    service: Arc<ClassificationService>,
    request_timeout: Duration,
    max_batch_size: usize,
}

/// Build the API router around a shared service.
pub fn router(service: Arc<ClassificationService>, limits: &LimitsConfig) -> Router {
    let state = AppState {
        service,
        request_timeout: Duration::from_secs(limits.request_timeout_secs),
        max_batch_size: limits.max_batch_size,
    };

    Router::new()
        .route("/classify", post(classify))
        .route("/batch-classify", post(batch_classify))
        .route("/health", get(health))
        .layer(ConcurrencyLimitLayer::new(limits.max_concurrent_requests.max(1)))
        .with_state(state)
}

async fn classify(
    State(state): State<AppState>,
    body: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<ClassificationResponse>, ApiError> {
    let Json(request) = body.map_err(ApiError::from_classify_rejection)?;

    let result = tokio::time::timeout(state.request_timeout, state.service.classify(&request.text))
        .await
        .map_err(|_| ApiError::Timeout(state.request_timeout.as_secs()))??;

    record_detached(&state.service, vec![(request.text, result.clone())]);
    Ok(Json(result.into()))
}

async fn batch_classify(
    State(state): State<AppState>,
    body: Result<Json<BatchClassifyRequest>, JsonRejection>,
) -> Result<Json<BatchResult>, ApiError> {
    let Json(request) = body.map_err(ApiError::from_batch_rejection)?;

    if request.reviews.len() > state.max_batch_size {
        return Err(ApiError::InvalidBatchInput(format!(
            "batch of {} reviews exceeds the limit of {}",
            request.reviews.len(),
            state.max_batch_size
        )));
    }
    debug!(
        reviews = request.reviews.len(),
        log_results = request.log_results,
        "batch request"
    );

    let results = tokio::time::timeout(
        state.request_timeout,
        state.service.classify_batch(request.reviews.as_slice()),
    )
    .await
    .map_err(|_| ApiError::Timeout(state.request_timeout.as_secs()))??;

    if request.log_results {
        record_detached(
            &state.service,
            request.reviews.into_iter().zip(results.iter().cloned()).collect(),
        );
    }
    Ok(Json(results))
}

/// Record computed results on a background task.
///
/// Sinks run outside the request deadline and never delay or fail the
/// response; their failures are logged and counted by the sink fan-out.
fn record_detached(
    service: &Arc<ClassificationService>,
    records: Vec<(String, ClassificationResult)>,
) {
    if records.is_empty() || service.sinks().is_empty() {
        return;
    }
    let service = Arc::clone(service);
    tokio::spawn(async move {
        for (text, result) in &records {
            service.record(text, result).await;
        }
    });
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::version_string(),
        model_id: state.service.model_id().to_string(),
        categories: state
            .service
            .categories()
            .iter()
            .map(str::to_string)
            .collect(),
    })
}
