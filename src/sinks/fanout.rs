//! Best-effort fan-out of records to every configured sink.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::join_all;
use tracing::{debug, warn};

use super::traits::TrackingSink;
use crate::HuginnError;
use crate::telemetry;
use crate::types::LogRecord;

/// Ordered collection of sinks that never fails its caller.
#[derive(Clone, Default)]
pub struct SinkSet {
    sinks: Vec<Arc<dyn TrackingSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Arc<dyn TrackingSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Hand `record` to every sink concurrently.
    ///
    /// Errors and panics are logged and counted, then returned for
    /// inspection; they are never propagated.
    pub async fn record(&self, record: &LogRecord) -> Vec<HuginnError> {
        let attempts = self.sinks.iter().map(|sink| async move {
            let outcome = AssertUnwindSafe(sink.record(record))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(HuginnError::sink(sink.name(), "sink panicked")));
            (sink.name(), outcome)
        });

        let mut failures = Vec::new();
        for (name, outcome) in join_all(attempts).await {
            let status = match outcome {
                Ok(()) => {
                    debug!(sink = name, "record delivered");
                    "ok"
                }
                Err(e) => {
                    let e = match e {
                        e @ HuginnError::LoggingSinkFailure { .. } => e,
                        other => HuginnError::sink(name, other),
                    };
                    warn!(sink = name, error = %e, "tracking sink failed, continuing");
                    failures.push(e);
                    "error"
                }
            };
            metrics::counter!(telemetry::SINK_RECORDS_TOTAL,
                "sink" => name.to_owned(),
                "status" => status,
            )
            .increment(1);
        }
        failures
    }
}

impl FromIterator<Arc<dyn TrackingSink>> for SinkSet {
    fn from_iter<T: IntoIterator<Item = Arc<dyn TrackingSink>>>(iter: T) -> Self {
        Self {
            sinks: iter.into_iter().collect(),
        }
    }
}

impl std::fmt::Debug for SinkSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkSet")
            .field("sinks", &self.names())
            .finish()
    }
}
