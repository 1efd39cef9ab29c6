//! Tracking sink trait.

use async_trait::async_trait;

use crate::Result;
use crate::types::LogRecord;

/// Destination for classification records (experiment trackers, logs).
///
/// Failures are reported as `LoggingSinkFailure` and are never fatal to the
/// classification that produced the record.
#[async_trait]
pub trait TrackingSink: Send + Sync {
    /// Sink name for logging and metrics labels.
    fn name(&self) -> &str;

    /// Persist one record.
    async fn record(&self, record: &LogRecord) -> Result<()>;
}
