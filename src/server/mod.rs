pub mod handlers;
pub mod lifecycle;
pub mod scratch;
pub mod types;

use crate::{
    Result,
    config::Config,
    engine::{HttpEngine, InferenceEngine, SamplingParams},
    processor::{FfprobeProbe, Processor},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use handlers::AppState;

pub fn create_router(state: AppState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;
    Router::new()
        .route("/infer", post(handlers::infer))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builds the application context. Fails if the checkpoint is unusable
/// or the engine cannot load the model.
pub async fn build_state(config: &Config) -> Result<AppState> {
    info!("Loading processor from {}", config.model.checkpoint_path);
    let probe = Arc::new(FfprobeProbe::new(config.model.probe_program.clone()));
    let processor = Processor::from_pretrained(
        &config.model.checkpoint_path,
        config.model.max_model_len,
        probe,
    )
    .await?;

    let engine = HttpEngine::connect(&config.engine, &config.model).await?;
    info!("Model loaded successfully");

    let scratch_root = config
        .server
        .scratch_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    tokio::fs::create_dir_all(&scratch_root).await?;

    Ok(AppState::new(
        Arc::new(engine),
        Arc::new(processor),
        SamplingParams::greedy(&config.model.sampling),
        scratch_root,
        config.server.max_concurrent_generations,
        config.server.max_upload_mb * 1024 * 1024,
    ))
}

pub async fn run(config: Config) -> Result<()> {
    // Nothing is served until the model is ready.
    let app_state = build_state(&config).await?;
    let engine: Arc<dyn InferenceEngine> = app_state.engine.clone();

    let app = create_router(app_state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, releasing engine");
    engine.shutdown().await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
}
