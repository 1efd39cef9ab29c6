//! Classification service: scoring, normalization and record fan-out.

mod builder;
mod normalize;
mod service;

pub use builder::ClassifierBuilder;
pub use service::ClassificationService;
