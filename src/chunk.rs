//! Fixed-window overlapping text chunker.
//!
//! Splits extracted document text into passages of at most `chunk_size`
//! characters, each overlapping its predecessor by `overlap` characters.
//! Windows are computed over `char` offsets so multi-byte UTF-8 input can
//! never be split inside a code point.
//!
//! The same `(text, chunk_size, overlap)` always yields the same sequence,
//! which is what makes reprocessing a document idempotent.

use crate::error::{RagError, Result};

/// Contract for a text splitter, so a semantic-boundary-aware strategy can be
/// substituted behind the same interface.
pub trait TextSplitter: Send + Sync {
    fn split(&self, text: &str) -> Result<Vec<String>>;
}

/// The default splitter: a sliding window with fixed stride.
#[derive(Debug, Clone, Copy)]
pub struct WindowSplitter {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl WindowSplitter {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::InvalidConfiguration(
                "chunk_size must be > 0".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(RagError::InvalidConfiguration(format!(
                "overlap ({}) must be < chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }
}

impl TextSplitter for WindowSplitter {
    fn split(&self, text: &str) -> Result<Vec<String>> {
        split(text, self.chunk_size, self.overlap)
    }
}

/// Split `text` into overlapping windows.
///
/// Window `i` covers characters `[i * stride, i * stride + chunk_size)` where
/// `stride = chunk_size - overlap`; the last window is truncated to the end
/// of the text. The number of chunks is `ceil(len / stride)`. Empty input
/// produces an empty sequence, not an error.
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    if chunk_size == 0 {
        return Err(RagError::InvalidConfiguration(
            "chunk_size must be > 0".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(RagError::InvalidConfiguration(format!(
            "overlap ({}) must be < chunk_size ({})",
            overlap, chunk_size
        )));
    }

    if text.is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let stride = chunk_size - overlap;
    let num_chunks = len.div_ceil(stride);

    let mut chunks = Vec::with_capacity(num_chunks);
    for i in 0..num_chunks {
        let start = i * stride;
        let end = (start + chunk_size).min(len);
        chunks.push(chars[start..end].iter().collect());
    }

    Ok(chunks)
}
