//! Crate-wide error taxonomy.
//!
//! Every fallible core operation returns [`RagError`] so callers can
//! distinguish caller bugs ([`RagError::InvalidConfiguration`]), transient
//! provider trouble ([`RagError::ProviderUnavailable`], eligible for retry),
//! hard provider failures ([`RagError::ProviderError`], never retried), and
//! contract violations ([`RagError::DimensionMismatch`]). The CLI boundary
//! wraps these in `anyhow` for display.

use std::fmt;

/// Errors produced by the RAG pipeline.
#[derive(Debug)]
pub enum RagError {
    /// Bad chunking or retrieval parameters. Caller bug; never retried.
    InvalidConfiguration(String),
    /// The provider could not be reached (connect error or timeout).
    /// Transient; eligible for bounded retry with backoff.
    ProviderUnavailable(String),
    /// The provider responded but with a non-2xx status or a body we could
    /// not parse. Surfaced immediately, not retried.
    ProviderError(String),
    /// An embedding vector did not match the configured dimension.
    DimensionMismatch { expected: usize, got: usize },
    /// Unknown document or session.
    NotFound(String),
    /// Owner mismatch on a document access.
    Unauthorized(String),
    /// Text extraction from raw bytes failed.
    Extraction(String),
    /// Underlying storage failure.
    Storage(String),
}

impl fmt::Display for RagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RagError::InvalidConfiguration(msg) => write!(f, "invalid configuration: {}", msg),
            RagError::ProviderUnavailable(msg) => write!(f, "provider unavailable: {}", msg),
            RagError::ProviderError(msg) => write!(f, "provider error: {}", msg),
            RagError::DimensionMismatch { expected, got } => {
                write!(f, "embedding dimension mismatch: expected {}, got {}", expected, got)
            }
            RagError::NotFound(what) => write!(f, "not found: {}", what),
            RagError::Unauthorized(what) => write!(f, "unauthorized: {}", what),
            RagError::Extraction(msg) => write!(f, "text extraction failed: {}", msg),
            RagError::Storage(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl std::error::Error for RagError {}

impl From<sqlx::Error> for RagError {
    fn from(e: sqlx::Error) -> Self {
        RagError::Storage(e.to_string())
    }
}

/// Shorthand result type used throughout the crate.
pub type Result<T> = std::result::Result<T, RagError>;
