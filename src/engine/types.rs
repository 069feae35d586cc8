use crate::config::SamplingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Decoding parameters applied to every generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_k: i32,
    pub top_p: f32,
}

impl SamplingParams {
    /// Greedy decoding: temperature is pinned to zero.
    pub fn greedy(config: &SamplingConfig) -> Self {
        Self {
            temperature: 0.0,
            max_tokens: config.max_tokens,
            top_k: config.top_k,
            top_p: config.top_p,
        }
    }
}

/// One prompt plus the visual payload it refers to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineInput {
    pub prompt: String,
    pub multi_modal_data: MultiModalData,
    pub mm_processor_kwargs: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiModalData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<PathBuf>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<Vec<VideoInput>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInput {
    pub path: PathBuf,
    pub frame_indices: Vec<u32>,
    pub resized_height: u32,
    pub resized_width: u32,
    pub sample_fps: f64,
    pub metadata: VideoMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub fps: f64,
    pub total_num_frames: u32,
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestOutput {
    pub outputs: Vec<CompletionOutput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOutput {
    pub text: String,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Parameters the engine worker needs to load the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineLoadRequest {
    pub model: String,
    pub tensor_parallel_size: u32,
    pub gpu_memory_utilization: f32,
    pub max_num_batched_tokens: u32,
    pub max_model_len: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest<'a> {
    pub inputs: &'a [EngineInput],
    pub sampling_params: &'a SamplingParams,
}
