//! Preprocess-and-ask client: transcode locally, upload, report the answer.

mod destination;
mod transcode;

pub use destination::{Destination, processed_file_name};
pub use transcode::{TranscodeSettings, Transcoder};

use crate::{Error, Result, config::ClientConfig};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};

/// Result of one upload. Transport problems are reported here rather
/// than returned as errors.
#[derive(Debug)]
pub enum RunOutcome {
    Answered {
        answer: String,
        elapsed: Duration,
        artifact: PathBuf,
    },
    Rejected {
        status: u16,
        body: String,
        elapsed: Duration,
        artifact: PathBuf,
    },
    TransportFailed {
        message: String,
        artifact: PathBuf,
    },
}

impl RunOutcome {
    pub fn artifact(&self) -> &Path {
        match self {
            Self::Answered { artifact, .. }
            | Self::Rejected { artifact, .. }
            | Self::TransportFailed { artifact, .. } => artifact,
        }
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Answered { answer, .. } => Some(answer),
            _ => None,
        }
    }

    /// Console rendering of the outcome.
    pub fn report(&self) -> String {
        match self {
            Self::Answered { answer, elapsed, .. } => format!(
                "Total time: {:.2}s\nInference succeeded:\n{}",
                elapsed.as_secs_f64(),
                answer
            ),
            Self::Rejected {
                status,
                body,
                elapsed,
                ..
            } => format!(
                "Total time: {:.2}s\nRequest failed: {} - {}",
                elapsed.as_secs_f64(),
                status,
                body
            ),
            Self::TransportFailed { message, .. } => format!("Request failed: {}", message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnswerBody {
    answer: String,
}

pub struct VideoQaClient {
    http: reqwest::Client,
    endpoint: String,
    transcoder: Transcoder,
    settings: TranscodeSettings,
    save_output: bool,
    output_dir: PathBuf,
}

impl VideoQaClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            transcoder: Transcoder::new(config.transcoder.clone()),
            settings: TranscodeSettings {
                width: config.width,
                height: config.height,
                fps: config.fps,
            },
            save_output: config.save_output,
            output_dir: PathBuf::from(&config.output_dir),
        })
    }

    pub fn infer_url(&self) -> String {
        format!("{}/infer", self.endpoint)
    }

    fn destination(&self, input: &Path) -> Result<Destination> {
        if self.save_output {
            Destination::persistent(&self.output_dir, input, &self.settings)
        } else {
            Destination::temporary()
        }
    }

    /// Transcodes `input`, uploads it with `question` and reports the
    /// answer. Only transcoder and local I/O problems are errors; the
    /// temporary artifact is released however this returns.
    pub async fn run(&self, input: &Path, question: &str) -> Result<RunOutcome> {
        let destination = self.destination(input)?;
        info!(
            "Transcoding {} with {} into {}",
            input.display(),
            self.transcoder.program(),
            destination.path().display()
        );
        self.transcoder
            .transcode(input, destination.path(), &self.settings)
            .await?;

        self.upload(destination.path(), question).await
    }

    pub async fn upload(&self, artifact: &Path, question: &str) -> Result<RunOutcome> {
        let bytes = tokio::fs::read(artifact).await?;
        let filename = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string());

        let video = Part::bytes(bytes)
            .file_name(filename)
            .mime_str("video/mp4")
            .map_err(|e| Error::internal(format!("Invalid MIME type: {}", e)))?;
        let form = Form::new()
            .part("video", video)
            .text("question", question.to_string());

        info!("Uploading video and requesting inference from {}", self.infer_url());
        let start = Instant::now();
        let sent = self.http.post(self.infer_url()).multipart(form).send().await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                warn!("Upload failed: {}", e);
                return Ok(RunOutcome::TransportFailed {
                    message: Error::transport(e.to_string()).to_string(),
                    artifact: artifact.to_path_buf(),
                });
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read response body: {}", e);
                return Ok(RunOutcome::TransportFailed {
                    message: Error::transport(e.to_string()).to_string(),
                    artifact: artifact.to_path_buf(),
                });
            }
        };
        let elapsed = start.elapsed();
        debug!("Inference responded {} after {:?}", status, elapsed);

        if status == reqwest::StatusCode::OK {
            match serde_json::from_str::<AnswerBody>(&body) {
                Ok(parsed) => Ok(RunOutcome::Answered {
                    answer: parsed.answer,
                    elapsed,
                    artifact: artifact.to_path_buf(),
                }),
                Err(e) => Ok(RunOutcome::TransportFailed {
                    message: Error::transport(format!("Malformed answer body: {}", e)).to_string(),
                    artifact: artifact.to_path_buf(),
                }),
            }
        } else {
            Ok(RunOutcome::Rejected {
                status: status.as_u16(),
                body,
                elapsed,
                artifact: artifact.to_path_buf(),
            })
        }
    }
}
