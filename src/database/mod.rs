// Database module
// LanceDB holds the chunk text alongside its embedding

pub mod lancedb;

pub use self::lancedb::{ChunkMetadata, EmbeddingRecord, SearchResult, VectorStore};
