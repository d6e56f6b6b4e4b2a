//! Core data models used throughout ragchat.
//!
//! These types represent the documents, passages, and conversation turns that
//! flow through the ingestion and answering pipeline.

use serde::{Deserialize, Serialize};

/// Processing state of an ingested document.
///
/// Transitions are owned by the orchestrator: `Processing -> Completed` when
/// every passage has been embedded and stored, `Processing -> Failed` when any
/// step raises. `Failed` is terminal for that attempt; a retry starts a fresh
/// pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(DocumentStatus::Processing),
            "completed" => Some(DocumentStatus::Completed),
            "failed" => Some(DocumentStatus::Failed),
            _ => None,
        }
    }
}

/// An uploaded document and its processing state.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub owner_id: String,
    /// Human-readable label for citations (typically the original filename).
    pub source_label: String,
    pub raw_text: String,
    pub status: DocumentStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Closed metadata schema attached to every passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageMetadata {
    pub source_label: String,
    pub total_chunks: i64,
}

/// A chunk of a document's text plus its embedding; the atomic unit of
/// retrieval. Immutable once stored — reprocessing a document replaces all of
/// its passages wholesale.
#[derive(Debug, Clone)]
pub struct Passage {
    pub document_id: String,
    pub owner_id: String,
    /// 0-based, order-preserving within the parent document.
    pub chunk_index: i64,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: PassageMetadata,
}

/// A retrieved passage with its similarity score. Ephemeral; rank is the
/// position in the returned sequence.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub passage: Passage,
    /// Cosine similarity against the query embedding; higher is more relevant.
    pub score: f64,
}

/// Speaker role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(Role::User),
            "ASSISTANT" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// One exchange in a chat session.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: i64,
    /// Joined retrieved-passage text; present only on assistant turns.
    pub retrieved_context: Option<String>,
}

/// The orchestrator's response to a query: the generated answer plus the
/// distinct source labels of the passages that informed it, in first-seen
/// rank order.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<String>,
}
