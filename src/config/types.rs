use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub logs: LogsConfig,
    /// Root under which per-request scratch directories are created.
    /// Falls back to the system temp directory.
    #[serde(default)]
    pub scratch_dir: Option<String>,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
    #[serde(default = "default_max_concurrent_generations")]
    pub max_concurrent_generations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: String,
    #[serde(default = "default_tensor_parallel_size")]
    pub tensor_parallel_size: u32,
    #[serde(default = "default_gpu_memory_utilization")]
    pub gpu_memory_utilization: f32,
    #[serde(default = "default_max_num_batched_tokens")]
    pub max_num_batched_tokens: u32,
    #[serde(default = "default_max_model_len")]
    pub max_model_len: u32,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default = "default_probe_program")]
    pub probe_program: String,
}

/// Decoding knobs fixed at startup. Temperature is not configurable:
/// every generation is greedy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_base_url")]
    pub base_url: String,
    /// Bound on connecting to the worker and on its health check.
    #[serde(default = "default_engine_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Bound on the model load call. Generation itself is never bounded.
    #[serde(default = "default_engine_load_timeout_secs")]
    pub load_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_input_video")]
    pub input_video: String,
    #[serde(default = "default_question")]
    pub question: String,
    /// Base URL of the inference service; `/infer` is appended.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_save_output")]
    pub save_output: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_transcoder")]
    pub transcoder: String,
    #[serde(default)]
    pub logs: LogsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            logs: LogsConfig::default(),
            scratch_dir: None,
            max_upload_mb: default_max_upload_mb(),
            max_concurrent_generations: default_max_concurrent_generations(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: default_checkpoint_path(),
            tensor_parallel_size: default_tensor_parallel_size(),
            gpu_memory_utilization: default_gpu_memory_utilization(),
            max_num_batched_tokens: default_max_num_batched_tokens(),
            max_model_len: default_max_model_len(),
            sampling: SamplingConfig::default(),
            probe_program: default_probe_program(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            top_k: default_top_k(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_engine_base_url(),
            connect_timeout_secs: default_engine_connect_timeout_secs(),
            load_timeout_secs: default_engine_load_timeout_secs(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            input_video: default_input_video(),
            question: default_question(),
            endpoint: default_endpoint(),
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            save_output: default_save_output(),
            output_dir: default_output_dir(),
            timeout_secs: default_timeout_secs(),
            transcoder: default_transcoder(),
            logs: LogsConfig::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_upload_mb() -> usize {
    1024
}

fn default_max_concurrent_generations() -> usize {
    1
}

fn default_checkpoint_path() -> String {
    "models/Qwen3-VL-4B-Instruct".to_string()
}

fn default_tensor_parallel_size() -> u32 {
    2
}

fn default_gpu_memory_utilization() -> f32 {
    0.95
}

fn default_max_num_batched_tokens() -> u32 {
    4000
}

fn default_max_model_len() -> u32 {
    32000
}

fn default_probe_program() -> String {
    "ffprobe".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_top_p() -> f32 {
    0.9
}

fn default_top_k() -> i32 {
    -1
}

fn default_engine_base_url() -> String {
    "http://127.0.0.1:8100".to_string()
}

fn default_engine_connect_timeout_secs() -> u64 {
    10
}

fn default_engine_load_timeout_secs() -> u64 {
    900
}

fn default_input_video() -> String {
    "10min.mp4".to_string()
}

fn default_question() -> String {
    "What is the video about".to_string()
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_width() -> u32 {
    320
}

fn default_height() -> u32 {
    240
}

fn default_fps() -> u32 {
    5
}

fn default_save_output() -> bool {
    true
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_transcoder() -> String {
    "ffmpeg".to_string()
}
