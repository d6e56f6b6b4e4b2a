//! Vector index abstraction and its two backends.
//!
//! The [`VectorIndex`] trait stores `(vector, passage, metadata)` tuples and
//! answers owner-scoped nearest-neighbor queries by brute-force cosine scan.
//! The contract, not the algorithm, is normative — an approximate index could
//! sit behind the same trait.
//!
//! Two implementations:
//! - **[`SqliteIndex`]** — passages table with an embedding BLOB per row,
//!   idempotent upsert on `(document_id, chunk_index)`, transactional
//!   whole-document replace.
//! - **[`MemoryIndex`]** — `RwLock`-guarded vector, used by unit tests.
//!
//! Ingestion stages a document's passages and commits them through
//! [`VectorIndex::replace_document`] in one step, so `search` never observes
//! a partially written document.

use std::sync::RwLock;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::{RagError, Result};
use crate::models::{Passage, PassageMetadata, RetrievalResult};

/// Storage and nearest-neighbor search over passages.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store a passage and its embedding. Idempotent on
    /// `(document_id, chunk_index)`: re-submission overwrites, never
    /// duplicates.
    async fn upsert(&self, passage: &Passage) -> Result<()>;

    /// Atomically replace all passages for a document. Used by ingestion so
    /// a document becomes visible all at once or not at all.
    async fn replace_document(&self, document_id: &str, passages: &[Passage]) -> Result<()>;

    /// Remove all passages for a document.
    async fn delete_by_document(&self, document_id: &str) -> Result<()>;

    /// Return at most `top_k` passages belonging to `owner_id`, ordered by
    /// cosine similarity descending; ties broken by ascending `chunk_index`
    /// then `document_id`.
    async fn search(
        &self,
        query: &[f32],
        owner_id: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>>;
}

fn check_dims(expected: usize, got: usize) -> Result<()> {
    if got != expected {
        return Err(RagError::DimensionMismatch { expected, got });
    }
    Ok(())
}

fn check_top_k(top_k: usize) -> Result<()> {
    if top_k == 0 {
        return Err(RagError::InvalidConfiguration(
            "top_k must be >= 1".to_string(),
        ));
    }
    Ok(())
}

/// Rank candidates: similarity descending, ties by ascending chunk index then
/// document id so results are deterministic.
fn rank(mut results: Vec<RetrievalResult>, top_k: usize) -> Vec<RetrievalResult> {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.passage.chunk_index.cmp(&b.passage.chunk_index))
            .then(a.passage.document_id.cmp(&b.passage.document_id))
    });
    results.truncate(top_k);
    results
}

// ============ SQLite backend ============

/// SQLite-backed index. Embeddings are stored as little-endian f32 BLOBs;
/// similarity is computed in Rust over an owner-filtered scan.
pub struct SqliteIndex {
    pool: SqlitePool,
    dims: usize,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool, dims: usize) -> Self {
        Self { pool, dims }
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn upsert(&self, passage: &Passage) -> Result<()> {
        check_dims(self.dims, passage.embedding.len())?;

        sqlx::query(
            r#"
            INSERT INTO passages (document_id, owner_id, chunk_index, text, embedding, source_label, total_chunks)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(document_id, chunk_index) DO UPDATE SET
                owner_id = excluded.owner_id,
                text = excluded.text,
                embedding = excluded.embedding,
                source_label = excluded.source_label,
                total_chunks = excluded.total_chunks
            "#,
        )
        .bind(&passage.document_id)
        .bind(&passage.owner_id)
        .bind(passage.chunk_index)
        .bind(&passage.text)
        .bind(vec_to_blob(&passage.embedding))
        .bind(&passage.metadata.source_label)
        .bind(passage.metadata.total_chunks)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn replace_document(&self, document_id: &str, passages: &[Passage]) -> Result<()> {
        for p in passages {
            check_dims(self.dims, p.embedding.len())?;
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM passages WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        for p in passages {
            sqlx::query(
                r#"
                INSERT INTO passages (document_id, owner_id, chunk_index, text, embedding, source_label, total_chunks)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&p.document_id)
            .bind(&p.owner_id)
            .bind(p.chunk_index)
            .bind(&p.text)
            .bind(vec_to_blob(&p.embedding))
            .bind(&p.metadata.source_label)
            .bind(p.metadata.total_chunks)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM passages WHERE document_id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        owner_id: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        check_top_k(top_k)?;
        check_dims(self.dims, query.len())?;

        let rows = sqlx::query(
            r#"
            SELECT document_id, owner_id, chunk_index, text, embedding, source_label, total_chunks
            FROM passages
            WHERE owner_id = ?
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let candidates: Vec<RetrievalResult> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let embedding = blob_to_vec(&blob);
                let score = cosine_similarity(query, &embedding) as f64;
                RetrievalResult {
                    passage: Passage {
                        document_id: row.get("document_id"),
                        owner_id: row.get("owner_id"),
                        chunk_index: row.get("chunk_index"),
                        text: row.get("text"),
                        embedding,
                        metadata: PassageMetadata {
                            source_label: row.get("source_label"),
                            total_chunks: row.get("total_chunks"),
                        },
                    },
                    score,
                }
            })
            .collect();

        Ok(rank(candidates, top_k))
    }
}

// ============ In-memory backend ============

/// In-memory index for unit tests and embedded use. Brute-force cosine scan
/// over a `RwLock`-guarded vector; the lock is never held across an await.
pub struct MemoryIndex {
    passages: RwLock<Vec<Passage>>,
    dims: usize,
}

impl MemoryIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            passages: RwLock::new(Vec::new()),
            dims,
        }
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, passage: &Passage) -> Result<()> {
        check_dims(self.dims, passage.embedding.len())?;
        let mut stored = self.passages.write().unwrap();
        stored.retain(|p| {
            !(p.document_id == passage.document_id && p.chunk_index == passage.chunk_index)
        });
        stored.push(passage.clone());
        Ok(())
    }

    async fn replace_document(&self, document_id: &str, passages: &[Passage]) -> Result<()> {
        for p in passages {
            check_dims(self.dims, p.embedding.len())?;
        }
        let mut stored = self.passages.write().unwrap();
        stored.retain(|p| p.document_id != document_id);
        stored.extend(passages.iter().cloned());
        Ok(())
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<()> {
        let mut stored = self.passages.write().unwrap();
        stored.retain(|p| p.document_id != document_id);
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        owner_id: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        check_top_k(top_k)?;
        check_dims(self.dims, query.len())?;

        let stored = self.passages.read().unwrap();
        let candidates: Vec<RetrievalResult> = stored
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .map(|p| RetrievalResult {
                passage: p.clone(),
                score: cosine_similarity(query, &p.embedding) as f64,
            })
            .collect();

        Ok(rank(candidates, top_k))
    }
}
