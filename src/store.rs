//! Document status store and chat history store.
//!
//! Both are collaborators the orchestrator reads from and writes to through
//! traits, so tests can run against in-memory backends and the CLI against
//! SQLite. Upload and processing are decoupled: callers observe ingestion
//! progress through the document's status, never by blocking on completion.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::error::{RagError, Result};
use crate::models::{Document, DocumentStatus, Role, Turn};

/// Persistence for documents and their processing status.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or update a document record.
    async fn save_document(&self, doc: &Document) -> Result<()>;

    /// Retrieve a document by id.
    async fn find_document(&self, document_id: &str) -> Result<Option<Document>>;

    /// All documents belonging to an owner, newest first.
    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>>;

    /// Remove a document record.
    async fn delete_document(&self, document_id: &str) -> Result<()>;
}

/// Append-only chat transcript store, scoped by session and owner.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append_turn(&self, session_id: &str, owner_id: &str, turn: &Turn) -> Result<()>;

    /// All turns for a session in chronological order.
    async fn list_turns(&self, session_id: &str, owner_id: &str) -> Result<Vec<Turn>>;
}

// ============ SQLite backends ============

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document> {
    let status_str: String = row.get("status");
    let status = DocumentStatus::parse(&status_str)
        .ok_or_else(|| RagError::Storage(format!("unknown document status: {}", status_str)))?;
    Ok(Document {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        source_label: row.get("source_label"),
        raw_text: row.get("raw_text"),
        status,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn save_document(&self, doc: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, owner_id, source_label, raw_text, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                source_label = excluded.source_label,
                raw_text = excluded.raw_text,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.owner_id)
        .bind(&doc.source_label)
        .bind(&doc.raw_text)
        .bind(doc.status.as_str())
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_document(&self, document_id: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>> {
        let rows =
            sqlx::query("SELECT * FROM documents WHERE owner_id = ? ORDER BY created_at DESC")
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(row_to_document).collect()
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append_turn(&self, session_id: &str, owner_id: &str, turn: &Turn) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO turns (session_id, owner_id, role, text, retrieved_context, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session_id)
        .bind(owner_id)
        .bind(turn.role.as_str())
        .bind(&turn.text)
        .bind(&turn.retrieved_context)
        .bind(turn.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_turns(&self, session_id: &str, owner_id: &str) -> Result<Vec<Turn>> {
        let rows = sqlx::query(
            r#"
            SELECT role, text, retrieved_context, created_at
            FROM turns
            WHERE session_id = ? AND owner_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(session_id)
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let role_str: String = row.get("role");
                let role = Role::parse(&role_str)
                    .ok_or_else(|| RagError::Storage(format!("unknown role: {}", role_str)))?;
                Ok(Turn {
                    role,
                    text: row.get("text"),
                    timestamp: row.get("created_at"),
                    retrieved_context: row.get("retrieved_context"),
                })
            })
            .collect()
    }
}

// ============ In-memory backends ============

/// In-memory document store for unit tests.
#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<HashMap<String, Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn save_document(&self, doc: &Document) -> Result<()> {
        self.docs
            .write()
            .unwrap()
            .insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn find_document(&self, document_id: &str) -> Result<Option<Document>> {
        Ok(self.docs.read().unwrap().get(document_id).cloned())
    }

    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .docs
            .read()
            .unwrap()
            .values()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(docs)
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        self.docs.write().unwrap().remove(document_id);
        Ok(())
    }
}

/// In-memory history store for unit tests. Keyed by `(session_id, owner_id)`.
#[derive(Default)]
pub struct MemoryHistoryStore {
    turns: RwLock<HashMap<(String, String), Vec<Turn>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append_turn(&self, session_id: &str, owner_id: &str, turn: &Turn) -> Result<()> {
        self.turns
            .write()
            .unwrap()
            .entry((session_id.to_string(), owner_id.to_string()))
            .or_default()
            .push(turn.clone());
        Ok(())
    }

    async fn list_turns(&self, session_id: &str, owner_id: &str) -> Result<Vec<Turn>> {
        Ok(self
            .turns
            .read()
            .unwrap()
            .get(&(session_id.to_string(), owner_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
