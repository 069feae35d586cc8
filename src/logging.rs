use crate::config::{LogFormat, LogsConfig};
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Validates that a log level string is valid
pub fn validate_log_level(level: &str) -> Result<()> {
    level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .map_err(|_| {
            anyhow::anyhow!(
                "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
                level
            )
        })?;
    Ok(())
}

/// Installs the global subscriber. `RUST_LOG` overrides the configured level.
/// Returns the level that was validated so callers can log it.
pub fn init(logs: &LogsConfig) -> Result<String> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| logs.level.clone());

    validate_log_level(&log_level)?;

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    match logs.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    Ok(log_level)
}
