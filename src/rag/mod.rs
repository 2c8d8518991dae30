// Retrieval-augmented answer chain
// Embeds the question, pulls the nearest chunks and asks the chat model


use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::database::VectorStore;
use crate::embeddings::OllamaClient;
use crate::llm::{ChatClient, ChatError, build_prompt};
use crate::{RagError, Result};

/// Number of chunks retrieved per question
pub const TOP_K: usize = 3;

/// Answer returned when the chat endpoint cannot be reached
pub const FALLBACK_ANSWER: &str = "Sorry, I couldn't connect to the language model.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub context: Vec<String>,
}

pub struct RagChain {
    vector_store: VectorStore,
    embedder: OllamaClient,
    chat: ChatClient,
}

impl RagChain {
    #[inline]
    pub fn new(vector_store: VectorStore, embedder: OllamaClient, chat: ChatClient) -> Self {
        Self {
            vector_store,
            embedder,
            chat,
        }
    }

    /// Open the configured store and build both Ollama clients
    #[inline]
    pub async fn from_config(config: &Config) -> Result<Self> {
        let vector_store = VectorStore::new(config).await?;
        let embedder = OllamaClient::new(config)?;
        let chat = ChatClient::new(config).map_err(|e| RagError::Config(e.to_string()))?;

        if vector_store.vector_dimension().is_none() {
            info!("Vector store is empty; run `ingest` to add documents");
        } else if !vector_store.validate_integrity().await? {
            warn!("Vector store failed its integrity check, answers may lack context");
        }

        Ok(Self::new(vector_store, embedder, chat))
    }

    /// Texts of the [`TOP_K`] chunks nearest to `query`, closest first
    #[inline]
    pub async fn retrieve_context(&self, query: &str) -> Result<Vec<String>> {
        let embedder = self.embedder.clone();
        let text = query.to_string();

        let embedding = tokio::task::spawn_blocking(move || embedder.generate_embedding(&text))
            .await
            .map_err(|e| RagError::Other(anyhow::anyhow!("Embedding task failed: {}", e)))?
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;

        let results = self
            .vector_store
            .search_similar(&embedding.embedding, TOP_K)
            .await?;

        debug!("Retrieved {} context chunks", results.len());

        Ok(results
            .into_iter()
            .map(|result| result.chunk_metadata.content)
            .collect())
    }

    /// Ask the chat model to answer `question` from `context`
    ///
    /// A transport failure yields [`FALLBACK_ANSWER`]; any other chat error is
    /// returned.
    #[inline]
    pub async fn generate_answer(&self, question: &str, context: &[String]) -> Result<String> {
        let prompt = build_prompt(context, question);
        let chat = self.chat.clone();

        let reply = tokio::task::spawn_blocking(move || chat.chat(&prompt))
            .await
            .map_err(|e| RagError::Other(anyhow::anyhow!("Chat task failed: {}", e)))?;

        match reply {
            Ok(answer) => Ok(answer),
            Err(ChatError::Transport(reason)) => {
                error!("Error connecting to Ollama: {}", reason);
                Ok(FALLBACK_ANSWER.to_string())
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Run retrieval then generation for one query
    #[inline]
    pub async fn execute(&self, query: &str) -> Result<QueryResponse> {
        let context = self.retrieve_context(query).await?;
        let answer = self.generate_answer(query, &context).await?;

        Ok(QueryResponse { answer, context })
    }
}
