//! Text extraction for uploaded documents.
//!
//! The pipeline consumes plain text; this module turns raw bytes into that
//! text. PDF is the only supported binary format; `.txt`/`.md` bytes pass
//! through as UTF-8. Unreadable or corrupt input returns
//! [`RagError::Extraction`] — never a panic — so the ingestion worker can
//! mark the document `Failed` and move on.

use crate::error::{RagError, Result};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";

/// Extract plain UTF-8 text from raw document bytes.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String> {
    match content_type {
        MIME_PDF => extract_pdf(bytes),
        MIME_TEXT => String::from_utf8(bytes.to_vec())
            .map_err(|e| RagError::Extraction(format!("invalid UTF-8: {}", e))),
        other => Err(RagError::Extraction(format!(
            "unsupported content-type: {}",
            other
        ))),
    }
}

/// Guess the content type from a filename extension.
pub fn content_type_for(path: &std::path::Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("pdf") => MIME_PDF,
        _ => MIME_TEXT,
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| RagError::Extraction(e.to_string()))
}
