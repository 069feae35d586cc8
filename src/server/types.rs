use crate::Error;
use axum::{http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct InferResponse {
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Maps a pipeline error to the wire contract: upload problems are the
/// client's fault, everything past validation is an inference error.
pub fn error_response(error: &Error) -> ApiError {
    let (status, detail) = match error {
        Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        Error::MissingField(_) => (StatusCode::UNPROCESSABLE_ENTITY, error.to_string()),
        Error::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Inference error: {}", other),
        ),
    };
    (status, Json(ErrorResponse { detail }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let (status, Json(body)) =
            error_response(&Error::validation("Uploaded file must be a video."));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.detail, "Uploaded file must be a video.");
    }

    #[test]
    fn test_missing_field_maps_to_unprocessable() {
        let (status, Json(body)) = error_response(&Error::missing_field("question"));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.detail, "Missing required field: question");
    }

    #[test]
    fn test_oversized_upload_maps_to_payload_too_large() {
        let (status, Json(body)) =
            error_response(&Error::payload_too_large("Upload exceeds the 16 MiB limit"));
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body.detail, "Upload exceeds the 16 MiB limit");
    }

    #[test]
    fn test_engine_failure_maps_to_inference_error() {
        let (status, Json(body)) = error_response(&Error::inference("CUDA out of memory"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.detail, "Inference error: CUDA out of memory");
    }
}
