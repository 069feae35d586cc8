mod client;
mod http;
mod types;

pub use client::InferenceEngine;
pub use http::HttpEngine;
pub use types::{
    CompletionOutput, EngineInput, EngineLoadRequest, MultiModalData, RequestOutput,
    SamplingParams, VideoInput, VideoMetadata,
};
