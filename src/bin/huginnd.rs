//! huginnd: Huginn daemon.
//!
//! Serves the review classifier over HTTP and records classifications to
//! the configured tracking sinks.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use huginn::server::config::{Backend, Config, ModelConfig, Secrets, TrackingConfig};
use huginn::sinks::{Experiment, HistorySink, LogSink, MlflowSink, ReadinessProbe};
use huginn::{CategoryScorer, ClassificationService, HuginnError, TrackingSink};

/// Huginn daemon: customer review classifier service.
#[derive(Parser)]
#[command(name = "huginnd")]
#[command(version = huginn::PKG_VERSION)]
#[command(about = "Huginn review classifier daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    let scorer = build_scorer(&config.model, &secrets)?;
    let mut builder = ClassificationService::builder()
        .shared_scorer(scorer)
        .categories(config.model.categories.clone())
        .template(config.model.hypothesis_template.clone())
        .batch_concurrency(config.model.batch_concurrency);
    for sink in build_sinks(&config.tracking, &secrets).await? {
        builder = builder.shared_sink(sink);
    }
    let service = Arc::new(builder.build()?);

    // Parse address
    let addr: SocketAddr = config
        .server
        .address
        .parse()
        .map_err(|e| HuginnError::Configuration(format!("Invalid address: {e}")))?;

    let app = huginn::server::router(Arc::clone(&service), &config.server.limits);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        version = huginn::version_string(),
        %addr,
        model = service.model_id(),
        sinks = ?service.sinks().names(),
        "huginnd ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("huginnd stopped");
    Ok(())
}

/// Build the scorer for the configured backend.
fn build_scorer(
    model: &ModelConfig,
    secrets: &Secrets,
) -> Result<Arc<dyn CategoryScorer>, HuginnError> {
    match model.backend {
        #[cfg(feature = "huggingface")]
        Backend::Huggingface => {
            use huginn::scorer::huggingface::{DEFAULT_BASE_URL, DEFAULT_MODEL};
            use huginn::scorer::HuggingFaceScorer;

            let api_key = secrets.huggingface_api_key();
            if api_key.is_none() {
                warn!("no Hugging Face API key configured, using anonymous access");
            }
            let scorer = HuggingFaceScorer::with_base_url(
                api_key,
                model.model_id.as_deref().unwrap_or(DEFAULT_MODEL),
                model.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
            )?
            .mode(model.scoring_mode());
            Ok(Arc::new(scorer))
        }

        #[cfg(feature = "local-inference")]
        Backend::Local => {
            use huginn::scorer::{Device, LocalNliModel, OnnxNliScorer, Serialized};

            let device = Device::parse(&model.device)?;
            let nli_model = LocalNliModel::from_repo_id(
                model
                    .model_id
                    .as_deref()
                    .unwrap_or("cross-encoder/nli-deberta-v3-small"),
            );
            let scorer = OnnxNliScorer::new(nli_model, device, model.models_dir.clone())?
                .mode(model.scoring_mode());
            Ok(Arc::new(Serialized::new(scorer)))
        }

        #[allow(unreachable_patterns)]
        other => {
            let _ = secrets;
            Err(HuginnError::Configuration(format!(
                "backend {other:?} is not compiled in (enable the matching cargo feature)"
            )))
        }
    }
}

/// Build the configured tracking sinks.
///
/// The MLflow sink is only added once its server answers its health check.
async fn build_sinks(
    tracking: &TrackingConfig,
    secrets: &Secrets,
) -> Result<Vec<Arc<dyn TrackingSink>>, HuginnError> {
    let mut sinks: Vec<Arc<dyn TrackingSink>> = Vec::new();

    if let Some(ref mlflow) = tracking.mlflow {
        let experiment = match (&mlflow.experiment_name, &mlflow.experiment_id) {
            (Some(name), _) => Experiment::Name(name.clone()),
            (None, Some(id)) => Experiment::Id(id.clone()),
            (None, None) => Experiment::default(),
        };
        let mut sink = MlflowSink::new(&mlflow.tracking_uri, experiment)?;
        if let Some(token) = secrets.mlflow_token() {
            sink = sink.token(token);
        }

        let probe =
            ReadinessProbe::new().deadline(Duration::from_secs(mlflow.ready_timeout_secs));
        if sink.wait_ready(&probe).await {
            sinks.push(Arc::new(sink));
        } else {
            warn!(
                tracking_uri = %mlflow.tracking_uri,
                "MLflow tracking server not ready, continuing without it"
            );
        }
    }

    if let Some(ref history) = tracking.history {
        let sink = HistorySink::new(history.resolved_dir(), &history.project);
        sinks.push(Arc::new(sink));
    }

    if tracking.log_events {
        sinks.push(Arc::new(LogSink));
    }

    Ok(sinks)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
