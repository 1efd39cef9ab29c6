//! Local zero-shot scoring with an NLI cross-encoder via ONNX Runtime.
//!
//! Each category becomes a hypothesis (`template.render(category)`) paired
//! with the review as premise. The entailment logits of all pairs are turned
//! into category scores: softmax across categories in single-label mode, or
//! an entailment-vs-contradiction softmax per category in multi-label mode.

use std::path::{Path, PathBuf};

use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use tokenizers::{Tokenizer, TruncationParams, TruncationStrategy};
use tracing::{debug, info};

use super::device::Device;
use super::traits::{LocalScorer, ScoringMode};
use crate::types::{HypothesisTemplate, ScoredCategory};
use crate::{HuginnError, Result};

/// Longest premise-hypothesis encoding the supported NLI models accept.
pub const MAX_SEQUENCE_LENGTH: usize = 512;

/// Supported local NLI models.
#[derive(Debug, Clone)]
pub enum LocalNliModel {
    /// cross-encoder/nli-deberta-v3-base: good balance of speed and accuracy.
    NliDebertaV3Base,
    /// cross-encoder/nli-deberta-v3-small: faster, slightly less accurate.
    NliDebertaV3Small,
    /// Any Hub repository shipping `onnx/model.onnx` and `tokenizer.json`.
    Hub { repo_id: String },
    /// Model and tokenizer from local paths.
    Custom {
        model_path: PathBuf,
        tokenizer_path: PathBuf,
    },
}

impl LocalNliModel {
    /// Map a Hub repository id to a model, preferring the named variants.
    pub fn from_repo_id(repo_id: &str) -> Self {
        match repo_id {
            "cross-encoder/nli-deberta-v3-base" => Self::NliDebertaV3Base,
            "cross-encoder/nli-deberta-v3-small" => Self::NliDebertaV3Small,
            other => Self::Hub {
                repo_id: other.to_string(),
            },
        }
    }

    /// HuggingFace repo ID, if the model comes from the Hub.
    pub fn repo_id(&self) -> Option<&str> {
        match self {
            Self::NliDebertaV3Base => Some("cross-encoder/nli-deberta-v3-base"),
            Self::NliDebertaV3Small => Some("cross-encoder/nli-deberta-v3-small"),
            Self::Hub { repo_id } => Some(repo_id),
            Self::Custom { .. } => None,
        }
    }

    /// Identifier reported as the scorer's model id.
    pub fn model_id(&self) -> String {
        match self.repo_id() {
            Some(repo_id) => repo_id.to_string(),
            None => match self {
                Self::Custom { model_path, .. } => model_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("custom")
                    .to_string(),
                _ => "custom".to_string(),
            },
        }
    }

    /// Resolve model and tokenizer paths, downloading if needed.
    fn resolve_paths(&self, cache_dir: &Path) -> Result<(PathBuf, PathBuf)> {
        match self {
            Self::Custom {
                model_path,
                tokenizer_path,
            } => Ok((model_path.clone(), tokenizer_path.clone())),
            _ => {
                let repo_id = self
                    .repo_id()
                    .ok_or_else(|| unavailable("model has no Hub repository"))?;
                download_model(repo_id, cache_dir)
            }
        }
    }
}

/// Positions of the NLI classes in the model's logits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NliLabelIndices {
    pub contradiction: usize,
    pub entailment: usize,
}

impl Default for NliLabelIndices {
    /// Cross-encoder order: contradiction (0), entailment (1), neutral (2).
    fn default() -> Self {
        Self {
            contradiction: 0,
            entailment: 1,
        }
    }
}

/// Local zero-shot scorer.
///
/// Requires `&mut self` to run the ONNX session; wrap it in
/// [`Serialized`](super::Serialized) to share it.
pub struct OnnxNliScorer {
    session: Session,
    tokenizer: Tokenizer,
    model_id: String,
    labels: NliLabelIndices,
    mode: ScoringMode,
    use_token_type_ids: bool,
}

impl OnnxNliScorer {
    /// Load `model` onto `device`, downloading into `cache_dir` if needed.
    pub fn new(model: LocalNliModel, device: Device, cache_dir: Option<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.unwrap_or_else(default_cache_dir);
        let (model_path, tokenizer_path) = model.resolve_paths(&cache_dir)?;

        let session = build_session(&model_path, &device)?;
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| unavailable(format!("failed to load tokenizer: {e}")))?;
        configure_truncation(&mut tokenizer, MAX_SEQUENCE_LENGTH)?;

        let model_id = model.model_id();
        info!(model = %model_id, device = device.name(), "local NLI model loaded");

        Ok(Self {
            session,
            tokenizer,
            model_id,
            labels: NliLabelIndices::default(),
            mode: ScoringMode::default(),
            use_token_type_ids: true,
        })
    }

    /// Set single- or multi-label scoring.
    pub fn mode(mut self, mode: ScoringMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the logit positions for models not using cross-encoder order.
    pub fn label_indices(mut self, labels: NliLabelIndices) -> Self {
        self.labels = labels;
        self
    }

    /// Whether the model graph takes a `token_type_ids` input (BART does not).
    pub fn token_type_ids(mut self, enabled: bool) -> Self {
        self.use_token_type_ids = enabled;
        self
    }

    /// Encode a premise-hypothesis pair for the model.
    fn encode_pair(&self, premise: &str, hypothesis: &str) -> Result<EncodedPair> {
        let encoding = self
            .tokenizer
            .encode((premise, hypothesis), true)
            .map_err(|e| unavailable(format!("tokenization failed: {e}")))?;

        Ok(EncodedPair {
            input_ids: encoding.get_ids().iter().map(|&id| id as i64).collect(),
            attention_mask: encoding
                .get_attention_mask()
                .iter()
                .map(|&m| m as i64)
                .collect(),
            token_type_ids: encoding.get_type_ids().iter().map(|&t| t as i64).collect(),
        })
    }

    /// Run the ONNX session on one pair and return its logits row.
    fn pair_logits(&mut self, pair: &EncodedPair) -> Result<Vec<f32>> {
        use ort::value::TensorRef;

        let shape = [1_usize, pair.input_ids.len()];

        let input_ids = TensorRef::from_array_view((shape, pair.input_ids.as_slice()))
            .map_err(|e| unavailable(format!("failed to create input_ids tensor: {e}")))?;
        let attention_mask = TensorRef::from_array_view((shape, pair.attention_mask.as_slice()))
            .map_err(|e| unavailable(format!("failed to create attention_mask tensor: {e}")))?;

        let outputs = if self.use_token_type_ids {
            let token_type_ids =
                TensorRef::from_array_view((shape, pair.token_type_ids.as_slice())).map_err(
                    |e| unavailable(format!("failed to create token_type_ids tensor: {e}")),
                )?;
            self.session.run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
                "token_type_ids" => token_type_ids,
            ])
        } else {
            self.session.run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
            ])
        }
        .map_err(|e| unavailable(format!("ONNX inference failed: {e}")))?;

        let logits = outputs
            .get("logits")
            .ok_or_else(|| unavailable("no logits output found"))?;
        let (_, data) = logits
            .try_extract_tensor::<f32>()
            .map_err(|e| unavailable(format!("failed to extract logits: {e}")))?;

        Ok(data.to_vec())
    }
}

impl LocalScorer for OnnxNliScorer {
    fn name(&self) -> &str {
        "onnx-nli"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn score(
        &mut self,
        text: &str,
        categories: &[&str],
        template: &HypothesisTemplate,
    ) -> Result<Vec<ScoredCategory>> {
        let mut logits = Vec::with_capacity(categories.len());
        for category in categories {
            let pair = self.encode_pair(text, &template.render(category))?;
            logits.push(self.pair_logits(&pair)?);
        }

        let scores = zero_shot_scores(&logits, self.labels, self.mode)?;
        debug!(model = %self.model_id, pairs = logits.len(), "local zero-shot scored");
        Ok(rank(categories, &scores))
    }
}

struct EncodedPair {
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
}

/// Turn per-category NLI logits into per-category scores.
fn zero_shot_scores(
    logits: &[Vec<f32>],
    labels: NliLabelIndices,
    mode: ScoringMode,
) -> Result<Vec<f32>> {
    let needed = labels.entailment.max(labels.contradiction) + 1;
    if let Some(row) = logits.iter().find(|row| row.len() < needed) {
        return Err(unavailable(format!(
            "expected at least {needed} logits per pair, got {}",
            row.len()
        )));
    }

    Ok(match mode {
        ScoringMode::SingleLabel => {
            let entailment: Vec<f32> = logits.iter().map(|row| row[labels.entailment]).collect();
            softmax(&entailment)
        }
        ScoringMode::MultiLabel => logits
            .iter()
            .map(|row| softmax(&[row[labels.contradiction], row[labels.entailment]])[1])
            .collect(),
    })
}

/// Pair categories with scores, highest first; ties keep category order.
fn rank(categories: &[&str], scores: &[f32]) -> Vec<ScoredCategory> {
    let mut ranked: Vec<ScoredCategory> = categories
        .iter()
        .zip(scores)
        .map(|(category, score)| ScoredCategory::new(*category, *score))
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// Softmax function.
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|x| x / sum).collect()
}

fn unavailable(reason: impl Into<String>) -> HuginnError {
    HuginnError::ScoringUnavailable(reason.into())
}

/// Cap pair encodings at `max_length` tokens, cutting only the premise so
/// the hypothesis always survives intact.
fn configure_truncation(tokenizer: &mut Tokenizer, max_length: usize) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            strategy: TruncationStrategy::OnlyFirst,
            max_length,
            ..TruncationParams::default()
        }))
        .map_err(|e| unavailable(format!("failed to configure truncation: {e}")))?;
    Ok(())
}

/// Build an ONNX session with the appropriate execution provider.
fn build_session(model_path: &Path, device: &Device) -> Result<Session> {
    let builder = Session::builder()
        .map_err(|e| unavailable(format!("failed to create session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| unavailable(format!("failed to set optimization level: {e}")))?;

    let builder = match device {
        Device::Cpu => builder,
        #[cfg(feature = "cuda")]
        Device::Cuda { device_id } => {
            use ort::execution_providers::CUDAExecutionProvider;
            builder
                .with_execution_providers([CUDAExecutionProvider::default()
                    .with_device_id(*device_id as i32)
                    .build()])
                .map_err(|e| unavailable(format!("failed to configure CUDA: {e}")))?
        }
    };

    builder
        .commit_from_file(model_path)
        .map_err(|e| unavailable(format!("failed to load ONNX model: {e}")))
}

/// Cache directory for downloaded models.
fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("huginn")
        .join("models")
}

/// Download model and tokenizer from HuggingFace Hub.
fn download_model(repo_id: &str, cache_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    use hf_hub::api::sync::ApiBuilder;

    let api = ApiBuilder::new()
        .with_cache_dir(cache_dir.to_path_buf())
        .with_progress(false)
        .build()
        .map_err(|e| unavailable(format!("failed to initialize HF Hub API: {e}")))?;

    let repo = api.model(repo_id.to_string());

    let model_path = repo
        .get("onnx/model.onnx")
        .map_err(|e| unavailable(format!("failed to download ONNX model for {repo_id}: {e}")))?;
    let tokenizer_path = repo
        .get("tokenizer.json")
        .map_err(|e| unavailable(format!("failed to download tokenizer for {repo_id}: {e}")))?;

    Ok((model_path, tokenizer_path))
}
