mod types;

pub use types::*;

use crate::Result;
use std::env;
use tracing::debug;

fn config_path() -> String {
    env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string())
}

pub async fn load() -> Result<Config> {
    let config_path = config_path();

    debug!("Loading configuration from: {}", config_path);

    let config_str = tokio::fs::read_to_string(&config_path).await?;
    let config: Config = serde_yaml::from_str(&config_str)?;

    Ok(config)
}

/// Like [`load`], but a missing file yields the built-in defaults.
/// A file that exists and fails to parse is still an error.
pub async fn load_or_default() -> Result<Config> {
    let config_path = config_path();

    match tokio::fs::try_exists(&config_path).await {
        Ok(true) => load().await,
        _ => {
            debug!("No configuration at {}, using defaults", config_path);
            Ok(Config::default())
        }
    }
}
