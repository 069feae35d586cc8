use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;
use video_qa::{
    Error, Result,
    engine::{CompletionOutput, EngineInput, InferenceEngine, RequestOutput, SamplingParams, VideoMetadata},
    processor::VideoProbe,
};

#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Error(String),
    NoCandidates,
}

/// A recorded `generate` call.
#[derive(Debug, Clone)]
pub struct GenerateCall {
    pub inputs: Vec<EngineInput>,
    pub params: SamplingParams,
    /// Whether every referenced video existed on disk during the call.
    pub videos_present: bool,
}

/// Mock inference engine for testing
#[derive(Debug)]
pub struct MockEngine {
    reply: MockReply,
    delay: Duration,
    pub calls: Arc<Mutex<Vec<GenerateCall>>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockEngine {
    pub fn new(reply: MockReply) -> Self {
        Self {
            reply,
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn answering(text: &str) -> Self {
        Self::new(MockReply::Text(text.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::new(MockReply::Error(message.to_string()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn get_calls(&self) -> Vec<GenerateCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn video_paths(&self) -> Vec<PathBuf> {
        self.get_calls()
            .into_iter()
            .flat_map(|call| call.inputs)
            .flat_map(|input| input.multi_modal_data.video.unwrap_or_default())
            .map(|video| video.path)
            .collect()
    }
}

#[async_trait]
impl InferenceEngine for MockEngine {
    async fn generate(
        &self,
        inputs: Vec<EngineInput>,
        params: &SamplingParams,
    ) -> Result<Vec<RequestOutput>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let videos_present = inputs
            .iter()
            .flat_map(|input| input.multi_modal_data.video.iter().flatten())
            .all(|video| video.path.exists());

        self.calls.lock().unwrap().push(GenerateCall {
            inputs: inputs.clone(),
            params: params.clone(),
            videos_present,
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match &self.reply {
            MockReply::Text(text) => Ok(vec![RequestOutput {
                outputs: vec![CompletionOutput {
                    text: text.clone(),
                    finish_reason: Some("stop".to_string()),
                }],
            }]),
            MockReply::Error(message) => Err(Error::inference(message.clone())),
            MockReply::NoCandidates => Ok(vec![RequestOutput { outputs: vec![] }]),
        }
    }
}

/// Probe that reports the same metadata for every file, or always fails.
pub struct StubProbe {
    result: std::result::Result<VideoMetadata, String>,
}

impl StubProbe {
    pub fn ten_minutes_at_5fps() -> Self {
        Self {
            result: Ok(VideoMetadata {
                fps: 5.0,
                total_num_frames: 3000,
                width: 320,
                height: 240,
                duration_secs: 600.0,
            }),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl VideoProbe for StubProbe {
    async fn probe(&self, path: &Path) -> Result<VideoMetadata> {
        if !path.exists() {
            return Err(Error::inference(format!("{} does not exist", path.display())));
        }
        self.result.clone().map_err(Error::inference)
    }
}
