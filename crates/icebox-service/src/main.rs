//! iceboxd - growth-experiment generation service
//!
//! HTTP backend around the generation pipeline: authenticated
//! experiment generation, backlog listing, lifecycle transitions, and
//! direct card edits.

use clap::Parser;
use icebox_model::{ModelConfig, OpenAiGenerator};
use icebox_pipeline::{GenerationPipeline, LifecycleService};
use icebox_service::state::AppState;
use icebox_service::{build_router, memory_collaborators};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Icebox daemon CLI
#[derive(Parser)]
#[command(name = "iceboxd")]
#[command(about = "Growth-experiment generation service", long_about = None)]
#[command(version)]
struct Cli {
    /// Listen address
    #[arg(
        short,
        long,
        env = "ICEBOX_LISTEN_ADDR",
        default_value = "127.0.0.1:8900"
    )]
    listen: SocketAddr,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "ICEBOX_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "ICEBOX_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());
    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let model_config = ModelConfig::from_env()?;
    let backend = Arc::new(OpenAiGenerator::new(model_config)?);

    let (sessions, contexts, goals, experiments) = memory_collaborators();
    let pipeline = Arc::new(GenerationPipeline::new(
        contexts.clone(),
        goals,
        experiments.clone(),
        backend,
    ));
    let lifecycle = Arc::new(LifecycleService::new(experiments.clone()));
    let state = AppState::new(sessions, contexts, experiments, pipeline, lifecycle);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    tracing::info!(addr = %cli.listen, "iceboxd listening");
    axum::serve(listener, app).await?;

    Ok(())
}
