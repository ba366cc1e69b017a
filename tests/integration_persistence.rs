#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Saving a store to the configured directory and reopening it

use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use recall::config::Config;
use recall::database::{SearchParams, StoreConfig};
use recall::{Document, Embedder, EmbeddingFailure, Metric, RagError, Retriever, VectorStore};
use tempfile::TempDir;

/// Embeds text as `[letters, digits, whitespace]`
struct ShapeEmbedder;

#[async_trait]
impl Embedder for ShapeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingFailure> {
        let count = |f: fn(&char) -> bool| text.chars().filter(f).count() as f32;
        Ok(vec![
            count(char::is_ascii_alphabetic),
            count(char::is_ascii_digit),
            count(char::is_ascii_whitespace),
        ])
    }

    fn model_name(&self) -> &str {
        "shape"
    }
}

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok(); // Ignore error if already initialized
}

fn config_in(dir: &TempDir) -> Config {
    let mut config = Config::load(dir.path()).expect("should load default config");
    config.store = StoreConfig {
        embedding_dimension: 3,
        metric: Metric::Euclidean,
    };
    config.chunking.chunk_size = 8;
    config.chunking.overlap = 2;
    config.save().expect("should save config");
    config
}

#[tokio::test]
async fn reopened_store_answers_like_the_original() {
    init_test_tracing();
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config = config_in(&temp_dir);

    let store = Arc::new(VectorStore::new(config.store).expect("should create store"));
    let retriever = Retriever::new(
        Arc::clone(&store),
        Arc::new(ShapeEmbedder),
        config.retrieval.clone(),
    )
    .with_chunking(config.chunking.clone());

    retriever
        .ingest(Document::with_id("mixed", "abc 123 def 456 ghi 789"))
        .await
        .expect("ingest should succeed");
    let before = retriever
        .retrieve("12345", 3, None)
        .await
        .expect("retrieve should succeed");

    store
        .save(config.vector_store_path())
        .expect("save should succeed");

    let reloaded_config = Config::load(temp_dir.path()).expect("should reload config");
    assert_eq!(reloaded_config.store, config.store);
    assert_eq!(reloaded_config.chunking, config.chunking);

    let reopened = Arc::new(
        VectorStore::open(reloaded_config.vector_store_path()).expect("open should succeed"),
    );
    let retriever = Retriever::new(
        Arc::clone(&reopened),
        Arc::new(ShapeEmbedder),
        reloaded_config.retrieval,
    );
    let after = retriever
        .retrieve("12345", 3, None)
        .await
        .expect("retrieve should succeed");

    assert_eq!(reopened.len(), store.len());
    assert_eq!(before, after);
}

#[test]
fn record_ids_stay_unique_across_reopen() {
    init_test_tracing();
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let path = temp_dir.path().join("vectors.json");

    let store = VectorStore::new(StoreConfig {
        embedding_dimension: 2,
        metric: Metric::Cosine,
    })
    .expect("should create store");
    let first = store
        .insert(recall::Chunk::new("doc", 0, "zero"), vec![1.0, 0.0])
        .expect("insert should succeed");
    let second = store
        .insert(recall::Chunk::new("doc", 1, "one"), vec![0.0, 1.0])
        .expect("insert should succeed");
    assert!(store.delete(second));
    store.save(&path).expect("save should succeed");

    let reopened = VectorStore::open(&path).expect("open should succeed");
    let third = reopened
        .insert(recall::Chunk::new("doc", 1, "one again"), vec![0.0, 1.0])
        .expect("insert should succeed");

    assert!(third > second);
    assert!(reopened.get(first).is_some());

    let hits = reopened
        .search(&[0.0, 1.0], &SearchParams::new(1))
        .expect("search should succeed");
    assert_eq!(hits[0].record_id, third);
}

#[test]
fn snapshot_with_mismatched_vector_is_rejected() {
    init_test_tracing();
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let path = temp_dir.path().join("vectors.json");

    let store = VectorStore::new(StoreConfig {
        embedding_dimension: 2,
        metric: Metric::Cosine,
    })
    .expect("should create store");
    store
        .insert(recall::Chunk::new("doc", 0, "zero"), vec![1.0, 0.0])
        .expect("insert should succeed");
    store.save(&path).expect("save should succeed");

    let tampered = fs::read_to_string(&path)
        .expect("should read snapshot")
        .replace("[1.0,0.0]", "[1.0,0.0,0.0]");
    fs::write(&path, tampered).expect("should write snapshot");

    assert!(matches!(
        VectorStore::open(&path),
        Err(RagError::DimensionMismatch {
            expected: 2,
            actual: 3
        })
    ));
}

#[test]
fn opening_a_missing_snapshot_fails() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");

    assert!(matches!(
        VectorStore::open(temp_dir.path().join("absent.json")),
        Err(RagError::Io(_))
    ));
}
