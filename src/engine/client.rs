use super::types::*;
use crate::Result;
use async_trait::async_trait;

/// The model runtime. Batching, parallelism and frame decoding live
/// behind this seam.
///
/// `generate` may take as long as the device needs; there is no timeout.
/// Implementations that block the calling thread must move the work off
/// the async runtime themselves (e.g. `tokio::task::spawn_blocking`).
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn generate(
        &self,
        inputs: Vec<EngineInput>,
        params: &SamplingParams,
    ) -> Result<Vec<RequestOutput>>;

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
