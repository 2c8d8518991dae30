use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Language model error: {0}")]
    Llm(#[from] llm::ChatError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod config;
pub mod database;
pub mod documents;
pub mod embeddings;
pub mod ingest;
pub mod llm;
pub mod rag;
pub mod server;
