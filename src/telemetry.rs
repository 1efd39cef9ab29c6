//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (prometheus, statsd, ...);
//! without a recorder installed, all metric calls are no-ops.
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms carry their unit.

/// Classification calls (single items; batch items count individually).
///
/// Labels: `status` ("ok" | "error").
pub const CLASSIFICATIONS_TOTAL: &str = "huginn_classifications_total";

/// Time spent in one scorer call plus normalization.
pub const CLASSIFY_DURATION_SECONDS: &str = "huginn_classify_duration_seconds";

/// Number of texts per batch request.
pub const BATCH_SIZE: &str = "huginn_batch_size";

/// Predicted top categories.
///
/// Labels: `category`.
pub const PREDICTED_CATEGORY_TOTAL: &str = "huginn_predicted_category_total";

/// Records handed to tracking sinks.
///
/// Labels: `sink`, `status` ("ok" | "error").
pub const SINK_RECORDS_TOTAL: &str = "huginn_sink_records_total";
