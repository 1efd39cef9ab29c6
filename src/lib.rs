//! Huginn - zero-shot triage of customer reviews
//!
//! Classifies free-text reviews into a fixed set of issue categories with a
//! pretrained zero-shot model, for single reviews and ordered batches, and
//! records every classification to experiment-tracking sinks.
//!
//! # Example
//!
//! ```rust,no_run
//! use huginn::ClassificationService;
//! use huginn::scorer::HuggingFaceScorer;
//!
//! #[tokio::main]
//! async fn main() -> huginn::Result<()> {
//!     let service = ClassificationService::builder()
//!         .scorer(HuggingFaceScorer::new(
//!             std::env::var("HF_API_KEY").ok(),
//!             "facebook/bart-large-mnli",
//!         )?)
//!         .build()?;
//!
//!     let result = service
//!         .classify("The box arrived crushed and the lid was missing.")
//!         .await?;
//!     println!("{} ({:.2})", result.top_category, result.top_score);
//!     Ok(())
//! }
//! ```

pub mod batch_input;
pub mod classifier;
#[cfg(feature = "client")]
pub mod client;
pub mod error;
pub mod report;
pub mod scorer;
#[cfg(feature = "server")]
pub mod server;
pub mod sinks;
pub mod telemetry;
pub mod types;
mod version;

// Re-export main types at crate root
pub use classifier::{ClassificationService, ClassifierBuilder};
pub use error::{HuginnError, Result};
pub use scorer::CategoryScorer;
pub use sinks::TrackingSink;
pub use version::{PKG_VERSION, user_agent, version_string};

pub use types::{
    BatchResult, CategorySet, ClassificationResult, HypothesisTemplate, LogRecord,
    ScoreDistribution, ScoredCategory,
};
