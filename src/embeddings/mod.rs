// Embeddings module
// Page text chunking and the Ollama embedding client

pub mod chunking;
pub mod ollama;

pub use chunking::{ChunkingConfig, ContentChunk, chunk_pages, estimate_token_count, split_text};
pub use ollama::{EmbeddingResult, OllamaClient};
