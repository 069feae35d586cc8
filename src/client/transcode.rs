use crate::{Error, Result};
use std::{ffi::OsString, path::Path};
use tokio::process::Command;
use tracing::{debug, info};

/// Target geometry and frame rate for the downsampled upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl TranscodeSettings {
    /// The `-vf` filter chain, e.g. `scale=320:240,fps=5`.
    pub fn filter(&self) -> String {
        format!("scale={}:{},fps={}", self.width, self.height, self.fps)
    }
}

pub struct Transcoder {
    program: String,
}

impl Transcoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self, input: &Path, output: &Path, settings: &TranscodeSettings) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), input.into()];
        args.extend(
            [
                "-vf".to_string(),
                settings.filter(),
                "-c:v".to_string(),
                "libx264".to_string(),
                "-preset".to_string(),
                "fast".to_string(),
                "-pix_fmt".to_string(),
                "yuv420p".to_string(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.into());
        args
    }

    pub async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        settings: &TranscodeSettings,
    ) -> Result<()> {
        let args = self.args(input, output, settings);
        debug!("Running {} {:?}", self.program, args);

        let result = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::config(format!(
                        "{} is not installed or not on PATH; install it first (e.g. sudo apt install ffmpeg)",
                        self.program
                    ))
                } else {
                    Error::transcode(format!("Failed to start {}: {}", self.program, e))
                }
            })?;

        if !result.status.success() {
            return Err(Error::transcode(
                String::from_utf8_lossy(&result.stderr).trim().to_string(),
            ));
        }

        info!("Video preprocessed and saved to: {}", output.display());
        Ok(())
    }
}
