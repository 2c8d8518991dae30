use super::*;
use crate::config::OllamaConfig;
use crate::embeddings::chunking::ContentChunk;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn config_for(server_uri: &str) -> Config {
    let url = Url::parse(server_uri).expect("mock server uri should parse");
    Config {
        ollama: OllamaConfig {
            host: url.host_str().unwrap_or("127.0.0.1").to_string(),
            port: url.port().unwrap_or(80),
            batch_size: 2,
            ..OllamaConfig::default()
        },
        ..Config::default()
    }
}

/// Responds with one `[len, index]` vector per input
fn echo_lengths(request: &Request) -> ResponseTemplate {
    let body: serde_json::Value =
        serde_json::from_slice(&request.body).expect("request body should be json");
    let inputs = body["input"].as_array().cloned().unwrap_or_default();
    let embeddings: Vec<Vec<f32>> = inputs
        .iter()
        .enumerate()
        .map(|(i, text)| vec![text.as_str().map_or(0, str::len) as f32, i as f32])
        .collect();
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "embeddings": embeddings }))
}

#[test]
fn client_configuration() {
    let config = Config {
        ollama: OllamaConfig {
            host: "test-host".to_string(),
            port: 1234,
            embedding_model: "test-model".to_string(),
            batch_size: 128,
            ..OllamaConfig::default()
        },
        ..Config::default()
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&Config::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);

    assert_eq!(client.retry_attempts, 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_embeddings_preserve_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(echo_lengths)
        .expect(2)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server.uri())).expect("client should build");
    let texts = vec!["a".to_string(), "bb".to_string(), "ccc".to_string()];

    let results = tokio::task::spawn_blocking(move || client.generate_embeddings_batch(&texts))
        .await
        .expect("task should join")
        .expect("embeddings should succeed");

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].embedding, vec![1.0, 0.0]);
    assert_eq!(results[1].embedding, vec![2.0, 1.0]);
    // Third text is sent in its own batch of size 1
    assert_eq!(results[2].embedding, vec![3.0, 0.0]);
    assert_eq!(results[2].text, "ccc");
}

#[tokio::test(flavor = "multi_thread")]
async fn chunk_embeddings_keep_chunk_token_counts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(echo_lengths)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server.uri())).expect("client should build");
    let chunks = vec![ContentChunk {
        content: "chunk text".to_string(),
        source: "a.pdf".to_string(),
        page: 1,
        chunk_index: 0,
        token_count: 42,
    }];

    let results = tokio::task::spawn_blocking(move || client.generate_chunk_embeddings(&chunks))
        .await
        .expect("task should join")
        .expect("embeddings should succeed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].token_count, 42);
}

#[tokio::test(flavor = "multi_thread")]
async fn mismatched_response_count_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "embeddings": [] })),
        )
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server.uri())).expect("client should build");

    let result = tokio::task::spawn_blocking(move || client.generate_embedding("question"))
        .await
        .expect("task should join");

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server.uri())).expect("client should build");

    let result = tokio::task::spawn_blocking(move || client.generate_embedding("question"))
        .await
        .expect("task should join");

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn validate_model_accepts_implicit_latest_tag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{ "name": "all-minilm:latest", "size": 45_000_000 }]
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server.uri())).expect("client should build");

    let result = tokio::task::spawn_blocking(move || client.health_check())
        .await
        .expect("task should join");

    assert!(result.is_ok(), "health check failed: {:?}", result.err());
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_model_lists_what_is_installed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{ "name": "all-minilm:latest", "size": 45_000_000 }]
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server.uri())).expect("client should build");

    let result = tokio::task::spawn_blocking(move || client.ensure_model_available("llama3"))
        .await
        .expect("task should join");

    let message = format!("{:#}", result.expect_err("llama3 is not installed"));
    assert!(message.contains("llama3"));
    assert!(message.contains("all-minilm:latest"));
}
