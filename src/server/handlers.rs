use super::{
    lifecycle::{RequestEvent, RequestLifecycle, RequestState},
    scratch::ScratchVideo,
    types::{ApiError, ErrorResponse, HealthResponse, InferResponse, error_response},
};
use crate::{
    Error, Result,
    engine::{InferenceEngine, SamplingParams},
    processor::{Processor, video_question},
};
use axum::{
    body::Bytes,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::Json,
};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const INVALID_VIDEO_DETAIL: &str = "Uploaded file must be a video.";

/// Everything a request needs, built once at startup and read-only after.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn InferenceEngine>,
    pub processor: Arc<Processor>,
    pub sampling: SamplingParams,
    pub scratch_root: PathBuf,
    /// Bounds how many generations run at once.
    pub admission: Arc<Semaphore>,
    /// Largest request body accepted on `/infer`.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        engine: Arc<dyn InferenceEngine>,
        processor: Arc<Processor>,
        sampling: SamplingParams,
        scratch_root: PathBuf,
        max_concurrent_generations: usize,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            engine,
            processor,
            sampling,
            scratch_root,
            admission: Arc::new(Semaphore::new(max_concurrent_generations.max(1))),
            max_upload_bytes,
        }
    }
}

struct VideoUpload {
    filename: Option<String>,
    bytes: Bytes,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn infer(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<InferResponse>, ApiError> {
    let mut lifecycle = RequestLifecycle::new(Uuid::new_v4().simple().to_string());

    let upload = match multipart {
        Ok(multipart) => read_upload(multipart, state.max_upload_bytes).await,
        Err(rejection) => Err(Error::validation(format!(
            "Malformed multipart body: {}",
            rejection.body_text()
        ))),
    };

    let (video, question) = match upload {
        Ok(upload) => upload,
        Err(e) => {
            warn!("Rejected upload for request {}: {}", lifecycle.id(), e);
            settle(&mut lifecycle, RequestEvent::ErrorOccurred);
            return Err(error_response(&e));
        }
    };

    info!(
        "Received inference request {} ({} bytes, question: {})",
        lifecycle.id(),
        video.bytes.len(),
        question
    );

    match answer(&state, &mut lifecycle, video, &question).await {
        Ok(answer) => {
            settle(&mut lifecycle, RequestEvent::ResponseSent);
            info!("Answered request {}", lifecycle.id());
            Ok(Json(InferResponse { answer }))
        }
        Err(e) => {
            error!("Inference failed for request {}: {}", lifecycle.id(), e);
            settle(&mut lifecycle, RequestEvent::ErrorOccurred);
            Err(error_response(&e))
        }
    }
}

/// Runs validated upload to answer. The scratch guard lives only inside
/// this function, so the staged file is gone before a response is built.
async fn answer(
    state: &AppState,
    lifecycle: &mut RequestLifecycle,
    video: VideoUpload,
    question: &str,
) -> Result<String> {
    lifecycle.transition(RequestEvent::UploadAccepted)?;

    let scratch =
        ScratchVideo::stage(&state.scratch_root, video.filename.as_deref(), &video.bytes).await?;
    drop(video);
    lifecycle.transition(RequestEvent::UploadStaged)?;

    let messages = video_question(scratch.path(), question);
    let input = state.processor.prepare_inputs(&messages).await?;
    lifecycle.transition(RequestEvent::PromptBuilt)?;

    let outputs = {
        let _permit = state
            .admission
            .acquire()
            .await
            .map_err(|e| Error::internal(format!("Admission closed: {}", e)))?;
        state.engine.generate(vec![input], &state.sampling).await?
    };

    let text = outputs
        .into_iter()
        .next()
        .and_then(|output| output.outputs.into_iter().next())
        .map(|candidate| candidate.text)
        .ok_or_else(|| Error::inference("Engine returned no candidates"))?;
    lifecycle.transition(RequestEvent::GenerationFinished)?;

    Ok(text.trim().to_string())
}

/// Moves the lifecycle to its terminal state. A refused transition is
/// logged and otherwise ignored, since the response is already decided.
fn settle(lifecycle: &mut RequestLifecycle, event: RequestEvent) -> RequestState {
    if let Err(e) = lifecycle.transition(event) {
        warn!("Request {} not settled by {:?}: {}", lifecycle.id(), event, e);
    }
    lifecycle.current_state()
}

/// Body-limit hits become 413 naming the limit; anything else is a
/// malformed form.
fn upload_error(error: MultipartError, context: &str, max_upload_bytes: usize) -> Error {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::payload_too_large(format!(
            "Upload exceeds the {} MiB limit",
            max_upload_bytes / (1024 * 1024)
        ))
    } else {
        Error::validation(format!("{}: {}", context, error.body_text()))
    }
}

/// Pulls the `video` and `question` fields out of the form. The video's
/// declared content type is checked before its body is read.
async fn read_upload(
    mut multipart: Multipart,
    max_upload_bytes: usize,
) -> Result<(VideoUpload, String)> {
    let mut video: Option<VideoUpload> = None;
    let mut question: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e, "Malformed multipart body", max_upload_bytes))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "video" => {
                let is_video = field
                    .content_type()
                    .map(|ct| ct.starts_with("video/"))
                    .unwrap_or(false);
                if !is_video {
                    return Err(Error::validation(INVALID_VIDEO_DETAIL));
                }
                let filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| upload_error(e, "Failed to read video", max_upload_bytes))?;
                video = Some(VideoUpload { filename, bytes });
            }
            "question" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| upload_error(e, "Failed to read question", max_upload_bytes))?;
                question = Some(text);
            }
            _ => {}
        }
    }

    let video = video.ok_or_else(|| Error::missing_field("video"))?;
    let question = question.ok_or_else(|| Error::missing_field("question"))?;
    Ok((video, question))
}

pub async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            detail: "Not Found".to_string(),
        }),
    )
}
