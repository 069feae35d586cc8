use anyhow::Result;
use std::path::Path;
use tracing::info;
use video_qa::{client::VideoQaClient, config, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let config = match config::load_or_default().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init(&config.client.logs) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let settings = &config.client;
    info!(
        "Preprocessing {} to {}x{} @ {} fps (save output: {})",
        settings.input_video, settings.width, settings.height, settings.fps, settings.save_output
    );

    let client = VideoQaClient::new(settings)?;

    // Transcoder problems abort; transport problems are only reported.
    let outcome = client
        .run(Path::new(&settings.input_video), &settings.question)
        .await?;

    println!("{}", outcome.report());

    Ok(())
}
