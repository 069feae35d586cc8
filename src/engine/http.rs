use super::{client::InferenceEngine, types::*};
use crate::{
    Error, Result,
    config::{EngineConfig, ModelConfig},
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Engine worker reached over HTTP. The worker owns the GPUs; this side
/// only ships prompts and visual payload references.
pub struct HttpEngine {
    base_url: String,
    client: reqwest::Client,
}

impl HttpEngine {
    /// Checks the worker is up and asks it to load the model. Any failure
    /// here is fatal for the server.
    pub async fn connect(engine: &EngineConfig, model: &ModelConfig) -> Result<Self> {
        let base_url = engine.base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(engine.connect_timeout_secs))
            .build()?;

        debug!("Checking engine worker health at {}", base_url);

        let health = client
            .get(format!("{}/health", base_url))
            .timeout(Duration::from_secs(engine.connect_timeout_secs))
            .send()
            .await
            .map_err(|e| Error::config(format!("Engine worker unreachable at {}: {}", base_url, e)))?;

        if !health.status().is_success() {
            return Err(Error::config(format!(
                "Engine worker at {} is not healthy: {}",
                base_url,
                health.status()
            )));
        }

        let load = EngineLoadRequest {
            model: model.checkpoint_path.clone(),
            tensor_parallel_size: model.tensor_parallel_size,
            gpu_memory_utilization: model.gpu_memory_utilization,
            max_num_batched_tokens: model.max_num_batched_tokens,
            max_model_len: model.max_model_len,
        };

        info!("Loading model {} on engine worker", load.model);

        let response = client
            .post(format!("{}/load", base_url))
            .timeout(Duration::from_secs(engine.load_timeout_secs))
            .json(&load)
            .send()
            .await
            .map_err(|e| Error::config(format!("Model load request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::config(format!(
                "Engine worker refused to load {}: {} - {}",
                load.model, status, body
            )));
        }

        Ok(Self { base_url, client })
    }
}

#[async_trait]
impl InferenceEngine for HttpEngine {
    async fn generate(
        &self,
        inputs: Vec<EngineInput>,
        params: &SamplingParams,
    ) -> Result<Vec<RequestOutput>> {
        debug!("Submitting {} input(s) to engine worker", inputs.len());

        let request = GenerateRequest {
            inputs: &inputs,
            sampling_params: params,
        };

        let response = self
            .client
            .post(format!("{}/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::inference(format!("Engine worker request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::inference(format!(
                "Engine worker returned {}: {}",
                status, body
            )));
        }

        let outputs: Vec<RequestOutput> = response
            .json()
            .await
            .map_err(|e| Error::inference(format!("Malformed engine worker response: {}", e)))?;

        debug!("Engine worker returned {} output(s)", outputs.len());
        Ok(outputs)
    }
}
