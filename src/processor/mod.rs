//! Turns a conversation into engine input: a rendered prompt plus the
//! normalized visual payload and the processor kwargs that describe it.

pub mod conversation;
mod template;
pub mod vision;

pub use conversation::{ContentPart, Message, Role, video_question};
pub use vision::{FfprobeProbe, VideoProbe};

use crate::{
    Error, Result,
    engine::{EngineInput, MultiModalData, VideoInput},
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::debug;

const PREPROCESSOR_CONFIG: &str = "preprocessor_config.json";

#[derive(Debug, Deserialize)]
struct PreprocessorConfig {
    #[serde(default = "default_patch_size")]
    patch_size: u32,
    #[serde(default = "default_merge_size")]
    merge_size: u32,
}

fn default_patch_size() -> u32 {
    16
}

fn default_merge_size() -> u32 {
    2
}

/// Visual content extracted from a conversation, in message order.
#[derive(Debug, Clone, Default)]
pub struct VisionInfo {
    pub images: Option<Vec<PathBuf>>,
    pub videos: Option<Vec<VideoInput>>,
    pub video_kwargs: Map<String, Value>,
}

pub struct Processor {
    patch_size: u32,
    merge_size: u32,
    max_model_len: u32,
    probe: Arc<dyn VideoProbe>,
}

impl Processor {
    pub fn new(
        patch_size: u32,
        merge_size: u32,
        max_model_len: u32,
        probe: Arc<dyn VideoProbe>,
    ) -> Self {
        Self {
            patch_size,
            merge_size,
            max_model_len,
            probe,
        }
    }

    /// Reads patch geometry from the checkpoint's preprocessor config.
    pub async fn from_pretrained(
        checkpoint: impl AsRef<Path>,
        max_model_len: u32,
        probe: Arc<dyn VideoProbe>,
    ) -> Result<Self> {
        let checkpoint = checkpoint.as_ref();
        if !tokio::fs::try_exists(checkpoint).await.unwrap_or(false) {
            return Err(Error::config(format!(
                "Model checkpoint not found: {}",
                checkpoint.display()
            )));
        }

        let config_path = checkpoint.join(PREPROCESSOR_CONFIG);
        let raw = tokio::fs::read_to_string(&config_path).await.map_err(|e| {
            Error::config(format!("Failed to read {}: {}", config_path.display(), e))
        })?;
        let config: PreprocessorConfig = serde_json::from_str(&raw)?;

        debug!(
            "Loaded processor config: patch_size={}, merge_size={}",
            config.patch_size, config.merge_size
        );

        Ok(Self::new(
            config.patch_size,
            config.merge_size,
            max_model_len,
            probe,
        ))
    }

    pub fn patch_size(&self) -> u32 {
        self.patch_size
    }

    /// Side length every resized frame must be a multiple of.
    pub fn image_factor(&self) -> u32 {
        self.patch_size * self.merge_size
    }

    pub fn apply_chat_template(&self, messages: &[Message], add_generation_prompt: bool) -> String {
        template::render(messages, add_generation_prompt)
    }

    pub async fn process_vision_info(&self, messages: &[Message]) -> Result<VisionInfo> {
        let mut images = Vec::new();
        let mut videos = Vec::new();

        for part in messages.iter().flat_map(|m| m.content.iter()) {
            match part {
                ContentPart::Image { image } => images.push(image.clone()),
                ContentPart::Video { video } => videos.push(self.fetch_video(video).await?),
                ContentPart::Text { .. } => {}
            }
        }

        let mut video_kwargs = Map::new();
        if !videos.is_empty() {
            let fps: Vec<f64> = videos.iter().map(|v| v.sample_fps).collect();
            video_kwargs.insert("fps".to_string(), json!(fps));
            // Frames are already chosen here; the engine must not resample.
            video_kwargs.insert("do_sample_frames".to_string(), Value::Bool(false));
        }

        Ok(VisionInfo {
            images: (!images.is_empty()).then_some(images),
            videos: (!videos.is_empty()).then_some(videos),
            video_kwargs,
        })
    }

    pub async fn prepare_inputs(&self, messages: &[Message]) -> Result<EngineInput> {
        let prompt = self.apply_chat_template(messages, true);
        let vision = self.process_vision_info(messages).await?;

        Ok(EngineInput {
            prompt,
            multi_modal_data: MultiModalData {
                image: vision.images,
                video: vision.videos,
            },
            mm_processor_kwargs: vision.video_kwargs,
        })
    }

    async fn fetch_video(&self, path: &Path) -> Result<VideoInput> {
        let metadata = self.probe.probe(path).await?;
        let nframes = vision::smart_nframes(metadata.total_num_frames, metadata.fps)?;

        let factor = self.image_factor();
        let factor_sq = (factor as u64) * (factor as u64);
        let min_pixels = vision::VIDEO_MIN_TOKENS * factor_sq;
        let total_pixels = (self.max_model_len as f64 * factor_sq as f64 * 0.9) as u64;
        let per_frame = total_pixels / nframes as u64 * vision::FRAME_FACTOR as u64;
        let max_pixels = (vision::VIDEO_MAX_TOKENS * factor_sq)
            .min(per_frame)
            .max((min_pixels as f64 * 1.05) as u64);

        let (resized_height, resized_width) = vision::smart_resize(
            metadata.height,
            metadata.width,
            factor,
            min_pixels,
            max_pixels,
        )?;

        let sample_fps = nframes as f64 / metadata.total_num_frames.max(1) as f64 * metadata.fps;

        debug!(
            "Video {}: {} of {} frames at {}x{} ({:.2} fps sampled)",
            path.display(),
            nframes,
            metadata.total_num_frames,
            resized_width,
            resized_height,
            sample_fps
        );

        Ok(VideoInput {
            path: path.to_path_buf(),
            frame_indices: vision::frame_indices(metadata.total_num_frames, nframes),
            resized_height,
            resized_width,
            sample_fps,
            metadata,
        })
    }
}
