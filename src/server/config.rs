//! Configuration loading for huginnd.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.huginn/config.toml` (user)
//! 3. `/etc/huginn/config.toml` (system)
//! 4. built-in defaults
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.huginn/secrets.toml` (user, must be 0600)
//! 2. `/etc/huginn/secrets.toml` (system, must be 0600)

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::scorer::ScoringMode;
use crate::types::{CategorySet, HypothesisTemplate};
use crate::{HuginnError, Result};

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:8000).
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            limits: LimitsConfig::default(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:8000".to_string()
}

/// Resource limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum concurrent requests (default: 100).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    /// Deadline for one classification request in seconds (default: 120).
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Maximum reviews per batch request (default: 1000).
    #[serde(default = "default_max_batch")]
    pub max_batch_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent(),
            request_timeout_secs: default_timeout(),
            max_batch_size: default_max_batch(),
        }
    }
}

fn default_max_concurrent() -> usize {
    100
}

fn default_timeout() -> u64 {
    120
}

fn default_max_batch() -> usize {
    1000
}

/// Scoring backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Hugging Face Inference API.
    #[default]
    Huggingface,
    /// Local ONNX cross-encoder (`local-inference` feature).
    Local,
}

/// Model and classification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub backend: Backend,
    /// Model id (default: facebook/bart-large-mnli for the API backend,
    /// cross-encoder/nli-deberta-v3-small for the local backend).
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub hypothesis_template: HypothesisTemplate,
    #[serde(default)]
    pub categories: CategorySet,
    /// Score categories independently instead of normalizing across them.
    #[serde(default)]
    pub multi_label: bool,
    /// Reviews of one batch scored at the same time (default: 1).
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
    /// Device for the local backend: "cpu", "cuda" or "cuda:<id>" (default: "cpu").
    #[serde(default = "default_device")]
    pub device: String,
    /// Directory for model downloads.
    #[serde(default)]
    pub models_dir: Option<PathBuf>,
    /// Inference API base URL override.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            model_id: None,
            hypothesis_template: HypothesisTemplate::default(),
            categories: CategorySet::default(),
            multi_label: false,
            batch_concurrency: default_batch_concurrency(),
            device: default_device(),
            models_dir: None,
            base_url: None,
        }
    }
}

impl ModelConfig {
    pub fn scoring_mode(&self) -> ScoringMode {
        if self.multi_label {
            ScoringMode::MultiLabel
        } else {
            ScoringMode::SingleLabel
        }
    }
}

fn default_batch_concurrency() -> usize {
    1
}

fn default_device() -> String {
    "cpu".to_string()
}

/// Tracking sink configuration. Each section enables its sink.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingConfig {
    /// Also emit every record as a `tracing` event.
    #[serde(default)]
    pub log_events: bool,
    #[serde(default)]
    pub mlflow: Option<MlflowConfig>,
    #[serde(default)]
    pub history: Option<HistoryConfig>,
}

/// MLflow tracking server.
#[derive(Debug, Clone, Deserialize)]
pub struct MlflowConfig {
    /// Tracking server URL (default: http://127.0.0.1:5000).
    #[serde(default = "default_tracking_uri")]
    pub tracking_uri: String,
    /// Experiment id; ignored when `experiment_name` is set (default: "0").
    #[serde(default)]
    pub experiment_id: Option<String>,
    /// Experiment name, created when missing.
    #[serde(default)]
    pub experiment_name: Option<String>,
    /// How long startup waits for the server to become ready (default: 30).
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_secs: u64,
}

fn default_tracking_uri() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_ready_timeout() -> u64 {
    30
}

/// Local run-history files.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Root directory (default: `<data dir>/huginn/runs`).
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_project")]
    pub project: String,
}

fn default_project() -> String {
    crate::sinks::history::DEFAULT_PROJECT.to_string()
}

impl HistoryConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("huginn")
                .join("runs")
        })
    }
}

/// Secrets configuration (API keys, tokens).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub huggingface: Option<ApiKeySecret>,
    #[serde(default)]
    pub mlflow: Option<TokenSecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

/// A single bearer token secret.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSecret {
    pub token: String,
}

const HF_API_KEY_ENV: &str = "HF_API_KEY";
const MLFLOW_TOKEN_ENV: &str = "MLFLOW_TRACKING_TOKEN";

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path must exist. Without one, the first existing standard
    /// file is used, else the built-in defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".huginn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/huginn/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Returns empty secrets if no file exists (keys may come from env vars).
    pub fn load() -> Result<Self> {
        // Try user secrets first
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".huginn").join("secrets.toml");
            if user_secrets.exists() {
                Self::check_permissions(&user_secrets)?;
                return Self::load_from_file(&user_secrets);
            }
        }

        // Try system secrets
        let system_secrets = PathBuf::from("/etc/huginn/secrets.toml");
        if system_secrets.exists() {
            Self::check_permissions(&system_secrets)?;
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(HuginnError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// Hugging Face API key, falling back to `HF_API_KEY`.
    pub fn huggingface_api_key(&self) -> Option<String> {
        self.huggingface
            .as_ref()
            .map(|s| s.api_key.clone())
            .or_else(|| std::env::var(HF_API_KEY_ENV).ok())
    }

    /// MLflow bearer token, falling back to `MLFLOW_TRACKING_TOKEN`.
    pub fn mlflow_token(&self) -> Option<String> {
        self.mlflow
            .as_ref()
            .map(|s| s.token.clone())
            .or_else(|| std::env::var(MLFLOW_TOKEN_ENV).ok())
    }
}
