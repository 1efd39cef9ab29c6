//! Tracking sinks fed by the classification service.

mod fanout;
pub mod history;
mod log_sink;
pub mod mlflow;
mod readiness;
mod traits;

pub use fanout::SinkSet;
pub use history::HistorySink;
pub use log_sink::LogSink;
pub use mlflow::{Experiment, MlflowSink};
pub use readiness::ReadinessProbe;
pub use traits::TrackingSink;
