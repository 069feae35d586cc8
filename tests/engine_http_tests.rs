use pretty_assertions::assert_eq;
use serde_json::{Map, json};
use video_qa::{
    Error,
    config::{EngineConfig, ModelConfig, SamplingConfig},
    engine::{EngineInput, HttpEngine, InferenceEngine, MultiModalData, SamplingParams},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path},
};

fn engine_config(server: &MockServer) -> EngineConfig {
    EngineConfig {
        base_url: format!("{}/", server.uri()),
        ..EngineConfig::default()
    }
}

async fn mount_ready_worker(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/load"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

fn text_input(prompt: &str) -> EngineInput {
    EngineInput {
        prompt: prompt.to_string(),
        multi_modal_data: MultiModalData::default(),
        mm_processor_kwargs: Map::new(),
    }
}

#[tokio::test]
async fn test_connect_sends_model_load_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/load"))
        .and(body_partial_json(json!({
            "model": "models/Qwen3-VL-4B-Instruct",
            "tensor_parallel_size": 2,
            "max_num_batched_tokens": 4000,
            "max_model_len": 32000
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let result = HttpEngine::connect(&engine_config(&server), &ModelConfig::default()).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_connect_fails_when_worker_unhealthy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = HttpEngine::connect(&engine_config(&server), &ModelConfig::default()).await;

    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn test_connect_fails_when_load_refused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/load"))
        .respond_with(ResponseTemplate::new(500).set_body_string("insufficient device memory"))
        .mount(&server)
        .await;

    let err = HttpEngine::connect(&engine_config(&server), &ModelConfig::default())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("insufficient device memory"));
}

#[tokio::test]
async fn test_connect_fails_when_worker_unreachable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = EngineConfig {
        base_url: format!("http://127.0.0.1:{}", port),
        ..EngineConfig::default()
    };
    let result = HttpEngine::connect(&config, &ModelConfig::default()).await;

    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn test_connect_gives_up_on_silent_worker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = EngineConfig {
        connect_timeout_secs: 1,
        ..engine_config(&server)
    };
    let started = std::time::Instant::now();
    let result = HttpEngine::connect(&config, &ModelConfig::default()).await;

    assert!(matches!(result, Err(Error::Config(_))));
    assert!(started.elapsed() < std::time::Duration::from_secs(4));
}

#[tokio::test]
async fn test_connect_gives_up_on_stalled_load() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/load"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = EngineConfig {
        load_timeout_secs: 1,
        ..engine_config(&server)
    };
    let result = HttpEngine::connect(&config, &ModelConfig::default()).await;

    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn test_generate_posts_inputs_and_greedy_params() {
    let server = MockServer::start().await;
    mount_ready_worker(&server).await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_partial_json(json!({
            "inputs": [{"prompt": "<|im_start|>user\nhi<|im_end|>\n"}],
            "sampling_params": {"temperature": 0.0, "max_tokens": 1024, "top_k": -1}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"outputs": [{"text": " Hello there. ", "finish_reason": "stop"}]}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let engine = HttpEngine::connect(&engine_config(&server), &ModelConfig::default())
        .await
        .unwrap();
    let params = SamplingParams::greedy(&SamplingConfig::default());

    let outputs = engine
        .generate(vec![text_input("<|im_start|>user\nhi<|im_end|>\n")], &params)
        .await
        .unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].outputs[0].text, " Hello there. ");
    assert_eq!(outputs[0].outputs[0].finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn test_generate_error_status_becomes_inference_error() {
    let server = MockServer::start().await;
    mount_ready_worker(&server).await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("CUDA out of memory"))
        .mount(&server)
        .await;

    let engine = HttpEngine::connect(&engine_config(&server), &ModelConfig::default())
        .await
        .unwrap();
    let params = SamplingParams::greedy(&SamplingConfig::default());

    let err = engine
        .generate(vec![text_input("x")], &params)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Inference(_)));
    assert!(err.to_string().contains("CUDA out of memory"));
}

#[tokio::test]
async fn test_generate_malformed_body_becomes_inference_error() {
    let server = MockServer::start().await;
    mount_ready_worker(&server).await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let engine = HttpEngine::connect(&engine_config(&server), &ModelConfig::default())
        .await
        .unwrap();
    let params = SamplingParams::greedy(&SamplingConfig::default());

    let result = engine.generate(vec![text_input("x")], &params).await;

    assert!(matches!(result, Err(Error::Inference(_))));
}

#[tokio::test]
async fn test_shutdown_is_a_no_op() {
    let server = MockServer::start().await;
    mount_ready_worker(&server).await;

    let engine = HttpEngine::connect(&engine_config(&server), &ModelConfig::default())
        .await
        .unwrap();

    assert!(engine.shutdown().await.is_ok());
}
