// Ingestion job
// Loads PDFs, chunks their pages, embeds the chunks and appends them to the vector store


use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::database::{ChunkMetadata, EmbeddingRecord, VectorStore};
use crate::documents::load_documents;
use crate::embeddings::{ContentChunk, EmbeddingResult, OllamaClient, chunk_pages};
use crate::{RagError, Result};

/// Chunks embedded and written per store append
const STORE_BATCH_SIZE: usize = 64;

/// Statistics about an ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionStats {
    pub files: usize,
    pub pages: usize,
    pub chunks: usize,
    pub embeddings: usize,
}

/// Ingest every PDF under the configured documents directory
///
/// When no pages are found the vector store is never opened, so nothing is
/// written. Any failure aborts the run.
#[inline]
pub async fn run_ingestion(config: &Config) -> Result<IngestionStats> {
    let documents_dir = config.documents_path().to_path_buf();
    info!("Loading PDF documents from {}", documents_dir.display());

    let pages = tokio::task::spawn_blocking(move || load_documents(&documents_dir))
        .await
        .map_err(|e| RagError::Other(anyhow::anyhow!("Document loading task failed: {}", e)))??;

    if pages.is_empty() {
        info!("No PDF documents found");
        return Ok(IngestionStats::default());
    }

    let mut sources: Vec<&str> = pages.iter().map(|p| p.source.as_str()).collect();
    sources.dedup();

    let mut stats = IngestionStats {
        files: sources.len(),
        pages: pages.len(),
        ..IngestionStats::default()
    };

    let chunks = chunk_pages(&pages, &config.chunking);
    stats.chunks = chunks.len();
    info!("Split {} pages into {} chunks", stats.pages, stats.chunks);

    let ollama_client = OllamaClient::new(config)?;
    let vector_store = VectorStore::new(config).await?;

    for batch in chunks.chunks(STORE_BATCH_SIZE) {
        let client = ollama_client.clone();
        let owned = batch.to_vec();
        let embeddings =
            tokio::task::spawn_blocking(move || client.generate_chunk_embeddings(&owned))
                .await
                .map_err(|e| RagError::Other(anyhow::anyhow!("Embedding task failed: {}", e)))?
                .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;

        let records = build_records(batch, embeddings);
        let stored = records.len();
        vector_store.store_embeddings_batch(records).await?;

        stats.embeddings += stored;
        debug!("Stored {}/{} embeddings", stats.embeddings, stats.chunks);
    }

    vector_store.optimize().await?;

    info!(
        "Ingested {} files ({} pages, {} chunks) into {}",
        stats.files,
        stats.pages,
        stats.chunks,
        config.vector_database_path().display()
    );
    Ok(stats)
}

fn build_records(
    chunks: &[ContentChunk],
    embeddings: Vec<EmbeddingResult>,
) -> Vec<EmbeddingRecord> {
    let created_at = Utc::now().to_rfc3339();

    chunks
        .iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| EmbeddingRecord {
            id: Uuid::new_v4().to_string(),
            vector: embedding.embedding,
            metadata: ChunkMetadata {
                source: chunk.source.clone(),
                page: chunk.page,
                chunk_index: chunk.chunk_index as u32,
                content: chunk.content.clone(),
                token_count: chunk.token_count as u32,
                created_at: created_at.clone(),
            },
        })
        .collect()
}
