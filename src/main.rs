use anyhow::Result;
use video_qa::{config, logging, server};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (before logging setup)
    let config = match config::load().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let log_level = match logging::init(&config.server.logs) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    info!("Starting video-qa server with log level: {}", log_level);
    info!("Configuration loaded successfully");

    // Model load failures end the process before anything is served.
    server::run(config).await?;

    Ok(())
}
