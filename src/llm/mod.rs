// Chat completion client for the Ollama `/api/chat` endpoint


use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::{Config, ConfigError};

/// Instruction template sent to the chat model
pub const PROMPT_TEMPLATE: &str = "
[INST]
You are a helpful AI assistant. Use the context provided to answer the user's question. If you don't know the answer, just say you don't know. Do not make up an answer.

Context:
{context}

Question:
{question}
[/INST]
";

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Could not reach the language model: {0}")]
    Transport(String),

    #[error("Language model returned HTTP {0}")]
    Status(u16),

    #[error("Malformed language model response: {0}")]
    MalformedResponse(String),
}

/// Render the prompt for `question`, with context chunks separated by blank lines
#[inline]
pub fn build_prompt(context: &[String], question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{context}", &context.join("\n\n"))
        .replace("{question}", question)
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    endpoint: Url,
    model: String,
    agent: ureq::Agent,
}

impl ChatClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let base_url = config.ollama_url()?;
        let endpoint = base_url
            .join("/api/chat")
            .map_err(|_| ConfigError::InvalidUrl(base_url.to_string()))?;

        Ok(Self {
            endpoint,
            model: config.ollama.chat_model.clone(),
            agent: build_agent(config.ollama.timeout()),
        })
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` as a single user message and return the trimmed reply
    ///
    /// Makes exactly one request; transport failures are reported as
    /// [`ChatError::Transport`] so callers can degrade gracefully.
    #[inline]
    pub fn chat(&self, prompt: &str) -> Result<String, ChatError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let body = serde_json::to_string(&request)
            .map_err(|e| ChatError::MalformedResponse(format!("request encoding: {}", e)))?;

        debug!(
            "Sending chat request to {} with model {}",
            self.endpoint, self.model
        );

        let mut response = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json")
            .send(&body)
            .map_err(|error| match error {
                ureq::Error::StatusCode(status) => {
                    warn!("Chat endpoint returned HTTP {}", status);
                    ChatError::Status(status)
                }
                other => ChatError::Transport(other.to_string()),
            })?;

        // Oversized replies count as malformed, not as transport failures
        let bytes = response
            .body_mut()
            .read_to_vec()
            .map_err(|error| match error {
                ureq::Error::BodyExceedsLimit(limit) => {
                    ChatError::MalformedResponse(format!("reply exceeds {} bytes", limit))
                }
                other => ChatError::Transport(other.to_string()),
            })?;

        let parsed: ChatResponse = serde_json::from_slice(&bytes)
            .map_err(|e| ChatError::MalformedResponse(e.to_string()))?;

        debug!(
            "Received chat reply ({} chars)",
            parsed.message.content.len()
        );
        Ok(parsed.message.content.trim().to_string())
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}
