//! Zero-shot category scorers.
//!
//! The hosted Hugging Face scorer needs the `huggingface` feature; the local
//! ONNX cross-encoder needs `local-inference`.

mod serialized;
mod traits;

#[cfg(feature = "local-inference")]
mod device;
#[cfg(feature = "huggingface")]
pub mod huggingface;
#[cfg(feature = "local-inference")]
pub mod onnx_nli;

pub use serialized::Serialized;
pub use traits::{CategoryScorer, LocalScorer, ScoringMode};

#[cfg(feature = "local-inference")]
pub use device::Device;
#[cfg(feature = "huggingface")]
pub use huggingface::HuggingFaceScorer;
#[cfg(feature = "local-inference")]
pub use onnx_nli::{LocalNliModel, NliLabelIndices, OnnxNliScorer};
