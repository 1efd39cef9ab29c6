//! Run-history sink writing one JSON event per line.
//!
//! Layout: `<dir>/<project>/<run_id>/history.jsonl`. One run spans the life
//! of the sink; every record is one step.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Serialize;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use super::traits::TrackingSink;
use crate::types::{LogRecord, ScoreDistribution};
use crate::{HuginnError, Result};

const SINK_NAME: &str = "history";

/// Project name used when none is configured.
pub const DEFAULT_PROJECT: &str = "customer-review-classifier";

/// Appends records to a per-run `history.jsonl`.
pub struct HistorySink {
    path: PathBuf,
    run_id: String,
    state: Mutex<RunState>,
}

struct RunState {
    file: Option<File>,
    step: u64,
}

#[derive(Serialize)]
struct HistoryEvent<'a> {
    #[serde(rename = "_step")]
    step: u64,
    #[serde(rename = "_timestamp")]
    timestamp: f64,
    review: &'a str,
    predicted_category: &'a str,
    confidence: f32,
    category_scores: &'a ScoreDistribution,
    model_id: &'a str,
}

impl HistorySink {
    /// Start a new run under `dir/project`. The file is created on first record.
    pub fn new(dir: impl AsRef<Path>, project: &str) -> Self {
        let run_id = new_run_id();
        let path = dir
            .as_ref()
            .join(project)
            .join(&run_id)
            .join("history.jsonl");
        info!(run_id = %run_id, path = %path.display(), "history run started");
        Self {
            path,
            run_id,
            state: Mutex::new(RunState {
                file: None,
                step: 0,
            }),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// File the run's events are appended to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| HuginnError::sink(SINK_NAME, format!("create {}: {e}", parent.display())))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| HuginnError::sink(SINK_NAME, format!("open {}: {e}", self.path.display())))
    }
}

#[async_trait]
impl TrackingSink for HistorySink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    async fn record(&self, record: &LogRecord) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.file.is_none() {
            state.file = Some(self.open().await?);
        }

        let event = HistoryEvent {
            step: state.step,
            timestamp: unix_seconds(),
            review: &record.review,
            predicted_category: &record.predicted_category,
            confidence: record.confidence,
            category_scores: &record.category_scores,
            model_id: &record.model_id,
        };
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');

        if let Some(file) = state.file.as_mut() {
            if let Err(e) = append_line(file, &line).await {
                // The handle may hold a partial line; reopen on the next record.
                state.file = None;
                return Err(HuginnError::sink(SINK_NAME, e));
            }
        }
        state.step += 1;
        Ok(())
    }
}

async fn append_line(file: &mut File, line: &[u8]) -> std::result::Result<(), String> {
    file.write_all(line).await.map_err(|e| format!("write: {e}"))?;
    file.flush().await.map_err(|e| format!("flush: {e}"))
}

fn unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

fn new_run_id() -> String {
    static SEQ: AtomicU32 = AtomicU32::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    format!("run-{nanos:x}-{}-{seq}", std::process::id())
}
