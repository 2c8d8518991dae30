#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

/// Integration tests for the LanceDB vector store with realistic data
use docs_rag::{
    config::{Config, PathsConfig},
    database::{ChunkMetadata, EmbeddingRecord, VectorStore},
};
use tempfile::TempDir;
use uuid::Uuid;

const DIMENSION: usize = 384;

fn create_test_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        paths: PathsConfig {
            documents_dir: temp_dir.path().join("documents"),
            vector_dir: temp_dir.path().join("vector_db"),
        },
        ..Config::default()
    };
    (config, temp_dir)
}

fn create_realistic_embedding_record(
    source: &str,
    page: u32,
    content: &str,
    vector_variation: f32,
) -> EmbeddingRecord {
    // all-minilm sized vectors
    let vector: Vec<f32> = (0..DIMENSION)
        .map(|i| (i as f32).mul_add(0.01, vector_variation).sin() * 0.1)
        .collect();

    EmbeddingRecord {
        id: Uuid::new_v4().to_string(),
        vector,
        metadata: ChunkMetadata {
            source: source.to_string(),
            page,
            chunk_index: 0,
            content: content.to_string(),
            token_count: content.split_whitespace().count() as u32,
            created_at: chrono::Utc::now().to_rfc3339(),
        },
    }
}

fn create_handbook_dataset() -> Vec<EmbeddingRecord> {
    vec![
        create_realistic_embedding_record(
            "employee-handbook.pdf",
            1,
            "Welcome to the company. This handbook describes policies that apply to every employee.",
            0.1,
        ),
        create_realistic_embedding_record(
            "employee-handbook.pdf",
            2,
            "Vacation requests must be submitted two weeks in advance through the HR portal.",
            0.2,
        ),
        create_realistic_embedding_record(
            "employee-handbook.pdf",
            3,
            "Remote work is permitted up to three days per week with manager approval.",
            0.3,
        ),
        create_realistic_embedding_record(
            "it-guide.pdf",
            1,
            "Laptops are issued on the first day. Report lost equipment to the help desk immediately.",
            0.8,
        ),
        create_realistic_embedding_record(
            "it-guide.pdf",
            2,
            "Passwords must be rotated every ninety days and may not be reused.",
            1.5,
        ),
        create_realistic_embedding_record(
            "travel-policy.pdf",
            1,
            "Economy class is required for flights shorter than six hours.",
            2.5,
        ),
    ]
}

#[tokio::test]
async fn realistic_storage_and_search() {
    let (config, _temp_dir) = create_test_config();
    let store = VectorStore::new(&config)
        .await
        .expect("should create vector store");

    let dataset = create_handbook_dataset();
    let result = store.store_embeddings_batch(dataset.clone()).await;
    assert!(
        result.is_ok(),
        "Failed to store handbook dataset: {:?}",
        result.err()
    );

    let count = store
        .count_embeddings()
        .await
        .expect("count embeddings should succeed");
    assert_eq!(count, dataset.len() as u64);

    let results = store
        .search_similar(&dataset[0].vector, 3)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 3, "Should respect limit");
    assert_eq!(results[0].chunk_metadata, dataset[0].metadata);
    assert!(results[0].distance.abs() < 1e-4, "Exact match comes first");
    for pair in results.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
        assert!(pair[0].similarity_score >= pair[1].similarity_score);
    }
}

#[tokio::test]
async fn search_relevance_ranking() {
    let (config, _temp_dir) = create_test_config();
    let store = VectorStore::new(&config)
        .await
        .expect("should create vector store");

    let dataset = create_handbook_dataset();
    store
        .store_embeddings_batch(dataset.clone())
        .await
        .expect("store should succeed");

    // Nearest neighbours of the vacation chunk are its page neighbours
    let results = store
        .search_similar(&dataset[1].vector, 3)
        .await
        .expect("search should succeed");

    let pages: Vec<(&str, u32)> = results
        .iter()
        .map(|r| (r.chunk_metadata.source.as_str(), r.chunk_metadata.page))
        .collect();
    assert_eq!(pages[0], ("employee-handbook.pdf", 2));
    assert!(pages[1..].contains(&("employee-handbook.pdf", 1)));
    assert!(pages[1..].contains(&("employee-handbook.pdf", 3)));
}

#[tokio::test]
async fn persists_across_reopen() {
    let (config, _temp_dir) = create_test_config();
    let dataset = create_handbook_dataset();

    {
        let store = VectorStore::new(&config)
            .await
            .expect("should create vector store");
        store
            .store_embeddings_batch(dataset[..3].to_vec())
            .await
            .expect("first ingestion should succeed");
    }

    let store = VectorStore::new(&config)
        .await
        .expect("should reopen vector store");
    assert_eq!(store.vector_dimension(), Some(DIMENSION));

    store
        .store_embeddings_batch(dataset[3..].to_vec())
        .await
        .expect("second ingestion should append");

    assert_eq!(
        store
            .count_embeddings()
            .await
            .expect("count embeddings should succeed"),
        dataset.len() as u64
    );
    assert!(
        store
            .validate_integrity()
            .await
            .expect("integrity check should run")
    );
}
