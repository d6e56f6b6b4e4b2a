//! End-to-end pipeline tests against the SQLite backends, with deterministic
//! in-process providers standing in for the embedding and generation APIs.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tempfile::TempDir;

use ragchat::config::{ChunkingConfig, RetrievalConfig};
use ragchat::embedding::EmbeddingProvider;
use ragchat::error::{RagError, Result};
use ragchat::generation::GenerationProvider;
use ragchat::index::{SqliteIndex, VectorIndex};
use ragchat::migrate;
use ragchat::models::{DocumentStatus, Passage, PassageMetadata, Role};
use ragchat::rag::RagEngine;
use ragchat::store::{DocumentStore, HistoryStore, SqliteDocumentStore, SqliteHistoryStore};

const DIMS: usize = 8;

fn hash_vec(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for (i, b) in text.bytes().enumerate() {
        v[(b as usize + i) % DIMS] += 1.0;
    }
    v
}

struct HashEmbedder;

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_vec(text))
    }
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_vec(t)).collect())
    }
    fn dims(&self) -> usize {
        DIMS
    }
    fn model_name(&self) -> &str {
        "hash-test"
    }
}

struct CannedGenerator;

#[async_trait]
impl GenerationProvider for CannedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        // Echo enough of the prompt to assert assembly happened.
        Ok(format!("answered ({} prompt chars)", prompt.chars().count()))
    }
    fn model_name(&self) -> &str {
        "canned-test"
    }
}

async fn setup_pool(tmp: &TempDir) -> SqlitePool {
    let path = tmp.path().join("ragchat.sqlite");
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .unwrap()
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    pool
}

fn passage(doc: &str, owner: &str, idx: i64, text: &str) -> Passage {
    Passage {
        document_id: doc.to_string(),
        owner_id: owner.to_string(),
        chunk_index: idx,
        text: text.to_string(),
        embedding: hash_vec(text),
        metadata: PassageMetadata {
            source_label: format!("{}.pdf", doc),
            total_chunks: 1,
        },
    }
}

#[tokio::test]
async fn test_sqlite_upsert_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let pool = setup_pool(&tmp).await;
    let index = SqliteIndex::new(pool, DIMS);

    index
        .upsert(&passage("d1", "u1", 0, "old text"))
        .await
        .unwrap();
    index
        .upsert(&passage("d1", "u1", 0, "new text"))
        .await
        .unwrap();

    let results = index.search(&hash_vec("new text"), "u1", 10).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].passage.text, "new text");
}

#[tokio::test]
async fn test_sqlite_tenant_isolation() {
    let tmp = TempDir::new().unwrap();
    let pool = setup_pool(&tmp).await;
    let index = SqliteIndex::new(pool, DIMS);

    index
        .upsert(&passage("d1", "alice", 0, "identical text"))
        .await
        .unwrap();
    index
        .upsert(&passage("d2", "bob", 0, "identical text"))
        .await
        .unwrap();

    let results = index
        .search(&hash_vec("identical text"), "bob", 10)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].passage.owner_id, "bob");
}

#[tokio::test]
async fn test_sqlite_replace_document_is_atomic_supersede() {
    let tmp = TempDir::new().unwrap();
    let pool = setup_pool(&tmp).await;
    let index = SqliteIndex::new(pool, DIMS);

    index
        .replace_document(
            "d1",
            &[
                passage("d1", "u1", 0, "first chunk"),
                passage("d1", "u1", 1, "second chunk"),
            ],
        )
        .await
        .unwrap();
    index
        .replace_document("d1", &[passage("d1", "u1", 0, "replacement")])
        .await
        .unwrap();

    let results = index
        .search(&hash_vec("replacement"), "u1", 10)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].passage.text, "replacement");
}

#[tokio::test]
async fn test_sqlite_search_rejects_wrong_dimension() {
    let tmp = TempDir::new().unwrap();
    let pool = setup_pool(&tmp).await;
    let index = SqliteIndex::new(pool, DIMS);

    let err = index.search(&[1.0, 2.0], "u1", 5).await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { .. }));
}

#[tokio::test]
async fn test_sqlite_document_store_status_transitions() {
    let tmp = TempDir::new().unwrap();
    let pool = setup_pool(&tmp).await;
    let store = SqliteDocumentStore::new(pool);

    let mut doc = ragchat::models::Document {
        id: "d1".to_string(),
        owner_id: "u1".to_string(),
        source_label: "a.pdf".to_string(),
        raw_text: "text".to_string(),
        status: DocumentStatus::Processing,
        created_at: 1,
        updated_at: 1,
    };
    store.save_document(&doc).await.unwrap();
    assert_eq!(
        store.find_document("d1").await.unwrap().unwrap().status,
        DocumentStatus::Processing
    );

    doc.status = DocumentStatus::Completed;
    doc.updated_at = 2;
    store.save_document(&doc).await.unwrap();
    assert_eq!(
        store.find_document("d1").await.unwrap().unwrap().status,
        DocumentStatus::Completed
    );

    assert!(store.find_document("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sqlite_history_is_chronological_and_scoped() {
    let tmp = TempDir::new().unwrap();
    let pool = setup_pool(&tmp).await;
    let store = SqliteHistoryStore::new(pool);

    for (i, text) in ["one", "two", "three"].iter().enumerate() {
        store
            .append_turn(
                "s1",
                "u1",
                &ragchat::models::Turn {
                    role: if i % 2 == 0 {
                        Role::User
                    } else {
                        Role::Assistant
                    },
                    text: text.to_string(),
                    timestamp: 100 + i as i64,
                    retrieved_context: None,
                },
            )
            .await
            .unwrap();
    }

    let turns = store.list_turns("s1", "u1").await.unwrap();
    let texts: Vec<&str> = turns.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);

    assert!(store.list_turns("s1", "other").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_full_pipeline_ingest_then_answer() {
    let tmp = TempDir::new().unwrap();
    let pool = setup_pool(&tmp).await;

    let index = Arc::new(SqliteIndex::new(pool.clone(), DIMS));
    let documents = Arc::new(SqliteDocumentStore::new(pool.clone()));
    let history = Arc::new(SqliteHistoryStore::new(pool));

    let engine = RagEngine::new(
        index,
        documents,
        Arc::clone(&history) as Arc<dyn HistoryStore>,
        Arc::new(HashEmbedder),
        Arc::new(CannedGenerator),
        ChunkingConfig {
            chunk_size: 40,
            overlap: 10,
        },
        RetrievalConfig {
            top_k: 3,
            max_history: 10,
        },
    );

    let status = engine
        .ingest(
            "d1",
            "alice",
            "manual.pdf",
            "The deployment manual describes rollback procedures and canary releases in detail.",
        )
        .await
        .unwrap();
    assert_eq!(status, DocumentStatus::Completed);

    let answer = engine
        .answer("how do rollbacks work?", "alice", "s1", 10)
        .await
        .unwrap();
    assert!(answer.text.starts_with("answered"));
    assert_eq!(answer.sources, vec!["manual.pdf"]);

    let turns = history.list_turns("s1", "alice").await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[1].role, Role::Assistant);
    assert!(turns[1].retrieved_context.is_some());

    // A second question sees the prior history.
    let answer2 = engine
        .answer("and canaries?", "alice", "s1", 10)
        .await
        .unwrap();
    assert!(answer2.text.starts_with("answered"));
    assert_eq!(history.list_turns("s1", "alice").await.unwrap().len(), 4);
}
