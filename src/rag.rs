//! RAG orchestration: document ingestion and query answering.
//!
//! [`RagEngine`] owns no global state — the index, stores, and providers are
//! injected at construction and shared via `Arc`, so the caller controls the
//! lifecycle of every collaborator.
//!
//! Ingestion is a per-document state machine: `Processing -> Completed` when
//! every chunk is embedded and committed, `Processing -> Failed` on any error.
//! Passages are staged in memory and committed through
//! [`VectorIndex::replace_document`] in one step, so a failed attempt leaves
//! nothing visible to search and a reprocessing pass supersedes all prior
//! passages.
//!
//! Answering is all-or-nothing: any failure before generation completes
//! aborts the query, and no turns are appended to the session history.

use std::sync::Arc;

use tracing::{error, info};

use crate::chunk::split;
use crate::config::{ChunkingConfig, RetrievalConfig};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::index::VectorIndex;
use crate::models::{
    Answer, Document, DocumentStatus, Passage, PassageMetadata, RetrievalResult, Role, Turn,
};
use crate::prompt::build_prompt;
use crate::store::{DocumentStore, HistoryStore};

/// Separator between retrieved passages stored on an assistant turn.
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

pub struct RagEngine {
    index: Arc<dyn VectorIndex>,
    documents: Arc<dyn DocumentStore>,
    history: Arc<dyn HistoryStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    chunking: ChunkingConfig,
    retrieval: RetrievalConfig,
}

impl RagEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: Arc<dyn VectorIndex>,
        documents: Arc<dyn DocumentStore>,
        history: Arc<dyn HistoryStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        chunking: ChunkingConfig,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            index,
            documents,
            history,
            embedder,
            generator,
            chunking,
            retrieval,
        }
    }

    /// Ingest a document: chunk, embed, and commit its passages, tracking the
    /// status transition. Returns the terminal status of this attempt; the
    /// failure itself is recorded on the document, not thrown to the
    /// uploader.
    pub async fn ingest(
        &self,
        document_id: &str,
        owner_id: &str,
        source_label: &str,
        raw_text: &str,
    ) -> Result<DocumentStatus> {
        let now = chrono::Utc::now().timestamp();
        let mut doc = Document {
            id: document_id.to_string(),
            owner_id: owner_id.to_string(),
            source_label: source_label.to_string(),
            raw_text: raw_text.to_string(),
            status: DocumentStatus::Processing,
            created_at: now,
            updated_at: now,
        };
        self.documents.save_document(&doc).await?;

        match self.process(&doc).await {
            Ok(chunk_count) => {
                doc.status = DocumentStatus::Completed;
                doc.updated_at = chrono::Utc::now().timestamp();
                self.documents.save_document(&doc).await?;
                info!(document_id, chunk_count, "document processing completed");
                Ok(DocumentStatus::Completed)
            }
            Err(e) => {
                error!(document_id, error = %e, "document processing failed");
                doc.status = DocumentStatus::Failed;
                doc.updated_at = chrono::Utc::now().timestamp();
                self.documents.save_document(&doc).await?;
                Ok(DocumentStatus::Failed)
            }
        }
    }

    /// Spawn ingestion as a background task. Callers observe progress through
    /// the document status store; they never block on completion.
    pub fn ingest_spawned(
        self: Arc<Self>,
        document_id: String,
        owner_id: String,
        source_label: String,
        raw_text: String,
    ) -> tokio::task::JoinHandle<()> {
        let engine = self;
        tokio::spawn(async move {
            if let Err(e) = engine
                .ingest(&document_id, &owner_id, &source_label, &raw_text)
                .await
            {
                error!(document_id, error = %e, "ingestion task failed");
            }
        })
    }

    /// The fallible middle of ingestion. Passages are staged locally and
    /// committed in a single replace, so an error anywhere here leaves no
    /// partial state behind.
    async fn process(&self, doc: &Document) -> Result<usize> {
        let chunks = split(
            &doc.raw_text,
            self.chunking.chunk_size,
            self.chunking.overlap,
        )?;
        let total_chunks = chunks.len() as i64;

        let embeddings = self.embedder.embed_batch(&chunks).await?;

        let passages: Vec<Passage> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, embedding))| Passage {
                document_id: doc.id.clone(),
                owner_id: doc.owner_id.clone(),
                chunk_index: i as i64,
                text,
                embedding,
                metadata: PassageMetadata {
                    source_label: doc.source_label.clone(),
                    total_chunks,
                },
            })
            .collect();

        let count = passages.len();
        // Supersedes any passages from a prior pass over this document.
        self.index.replace_document(&doc.id, &passages).await?;
        Ok(count)
    }

    /// Answer a query against the owner's corpus and the session history.
    pub async fn answer(
        &self,
        query: &str,
        owner_id: &str,
        session_id: &str,
        max_history: usize,
    ) -> Result<Answer> {
        let query_vec = self.embedder.embed(query).await?;
        let results = self
            .index
            .search(&query_vec, owner_id, self.retrieval.top_k)
            .await?;
        let history = self.history.list_turns(session_id, owner_id).await?;

        let prompt = build_prompt(query, &results, &history, max_history);
        let answer_text = self.generator.generate(&prompt).await?;

        let sources = dedup_sources(&results);
        info!(
            owner_id,
            session_id,
            retrieved = results.len(),
            "generated answer"
        );

        // Turns are appended only after generation succeeded; a failed query
        // leaves the transcript untouched.
        let now = chrono::Utc::now().timestamp();
        self.history
            .append_turn(
                session_id,
                owner_id,
                &Turn {
                    role: Role::User,
                    text: query.to_string(),
                    timestamp: now,
                    retrieved_context: None,
                },
            )
            .await?;

        let retrieved_context = if results.is_empty() {
            None
        } else {
            Some(
                results
                    .iter()
                    .map(|r| r.passage.text.as_str())
                    .collect::<Vec<_>>()
                    .join(CONTEXT_SEPARATOR),
            )
        };
        self.history
            .append_turn(
                session_id,
                owner_id,
                &Turn {
                    role: Role::Assistant,
                    text: answer_text.clone(),
                    timestamp: now,
                    retrieved_context,
                },
            )
            .await?;

        Ok(Answer {
            text: answer_text,
            sources,
        })
    }

    /// Fetch a document, enforcing ownership.
    pub async fn get_document(&self, document_id: &str, owner_id: &str) -> Result<Document> {
        let doc = self
            .documents
            .find_document(document_id)
            .await?
            .ok_or_else(|| RagError::NotFound(format!("document {}", document_id)))?;
        if doc.owner_id != owner_id {
            return Err(RagError::Unauthorized(format!("document {}", document_id)));
        }
        Ok(doc)
    }

    pub async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>> {
        self.documents.list_documents(owner_id).await
    }

    /// Delete a document and all of its passages, enforcing ownership.
    pub async fn delete_document(&self, document_id: &str, owner_id: &str) -> Result<()> {
        // Ownership check happens before anything is removed.
        self.get_document(document_id, owner_id).await?;
        self.index.delete_by_document(document_id).await?;
        self.documents.delete_document(document_id).await?;
        info!(document_id, "document deleted");
        Ok(())
    }

    pub async fn session_history(&self, session_id: &str, owner_id: &str) -> Result<Vec<Turn>> {
        self.history.list_turns(session_id, owner_id).await
    }
}

/// Deduplicate source labels preserving first-seen (rank) order.
fn dedup_sources(results: &[RetrievalResult]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for r in results {
        let label = &r.passage.metadata.source_label;
        if seen.insert(label.clone()) {
            out.push(label.clone());
        }
    }
    out
}
