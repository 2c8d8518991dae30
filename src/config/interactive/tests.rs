use super::load_existing_config as load_existing_config_impl;
use super::test_ollama_connection;
use crate::config::{Config, OllamaConfig};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn load_existing_config() {
    let config = load_existing_config_impl().expect("config loaded successfully");
    assert!(!config.ollama.host.is_empty());
    assert!(config.ollama.port > 0);
    assert!(!config.ollama.embedding_model.is_empty());
    assert!(!config.ollama.chat_model.is_empty());
    assert!(config.ollama.batch_size > 0);
}

async fn ollama_with_models(models: &[&str]) -> (MockServer, Config) {
    let server = MockServer::start().await;
    let listed: Vec<serde_json::Value> = models
        .iter()
        .map(|name| serde_json::json!({ "name": name, "size": 1 }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "models": listed })),
        )
        .mount(&server)
        .await;

    let url = Url::parse(&server.uri()).expect("mock server uri should parse");
    let config = Config {
        ollama: OllamaConfig {
            host: url.host_str().unwrap_or("127.0.0.1").to_string(),
            port: url.port().unwrap_or(80),
            embedding_model: "all-minilm".to_string(),
            chat_model: "llama3".to_string(),
            ..OllamaConfig::default()
        },
        ..Config::default()
    };
    (server, config)
}

#[tokio::test(flavor = "multi_thread")]
async fn connection_check_passes_with_both_models() {
    let (_server, config) = ollama_with_models(&["all-minilm:latest", "llama3:latest"]).await;

    let result = tokio::task::spawn_blocking(move || test_ollama_connection(&config))
        .await
        .expect("task should join");

    assert!(result.is_ok(), "connection check failed: {:?}", result.err());
}

#[tokio::test(flavor = "multi_thread")]
async fn connection_check_reports_missing_chat_model() {
    let (_server, config) = ollama_with_models(&["all-minilm:latest"]).await;

    let result = tokio::task::spawn_blocking(move || test_ollama_connection(&config))
        .await
        .expect("task should join");

    let message = format!("{:#}", result.expect_err("chat model is missing"));
    assert!(message.contains("llama3"));
}

#[tokio::test(flavor = "multi_thread")]
async fn connection_check_reports_missing_embedding_model() {
    let (_server, config) = ollama_with_models(&["llama3"]).await;

    let result = tokio::task::spawn_blocking(move || test_ollama_connection(&config))
        .await
        .expect("task should join");

    assert!(result.is_err());
}
