use super::mocks::{MockEngine, StubProbe};
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use video_qa::{
    config::SamplingConfig,
    engine::SamplingParams,
    processor::Processor,
    server::{AppState, create_router},
};

pub const BOUNDARY: &str = "----video-qa-test-boundary";
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub struct TestApp {
    pub router: Router,
    pub scratch: TempDir,
    pub engine: Arc<MockEngine>,
}

impl TestApp {
    /// Number of entries left under the scratch root.
    pub fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.scratch.path()).unwrap().count()
    }
}

pub fn create_test_app(engine: MockEngine) -> TestApp {
    create_test_app_with(engine, StubProbe::ten_minutes_at_5fps(), 1)
}

pub fn create_test_app_with(
    engine: MockEngine,
    probe: StubProbe,
    max_concurrent_generations: usize,
) -> TestApp {
    let scratch = tempfile::tempdir().expect("Failed to create scratch root");
    let engine = Arc::new(engine);
    let processor = Processor::new(16, 2, 32000, Arc::new(probe));

    let state = AppState::new(
        engine.clone(),
        Arc::new(processor),
        SamplingParams::greedy(&SamplingConfig::default()),
        scratch.path().to_path_buf(),
        max_concurrent_generations,
        MAX_UPLOAD_BYTES,
    );

    TestApp {
        router: create_router(state),
        scratch,
        engine,
    }
}

/// One part of a multipart form.
pub struct FormPart {
    pub name: &'static str,
    pub filename: Option<&'static str>,
    pub content_type: Option<&'static str>,
    pub data: Vec<u8>,
}

impl FormPart {
    pub fn video(filename: &'static str, content_type: &'static str, data: &[u8]) -> Self {
        Self {
            name: "video",
            filename: Some(filename),
            content_type: Some(content_type),
            data: data.to_vec(),
        }
    }

    pub fn text(name: &'static str, value: &str) -> Self {
        Self {
            name,
            filename: None,
            content_type: None,
            data: value.as_bytes().to_vec(),
        }
    }
}

pub fn multipart_body(parts: &[FormPart]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = part.filename {
            disposition.push_str(&format!("; filename=\"{}\"", filename));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn infer_request(parts: &[FormPart]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/infer")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// The usual valid upload: an mp4 plus a question.
pub fn video_question_request(question: &str) -> Request<Body> {
    infer_request(&[
        FormPart::video("clip.mp4", "video/mp4", b"\x00\x00\x00\x18ftypmp42"),
        FormPart::text("question", question),
    ])
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
