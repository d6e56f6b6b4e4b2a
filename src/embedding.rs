//! Embedding provider abstraction and the Ollama implementation.
//!
//! Defines the [`EmbeddingProvider`] trait and [`OllamaEmbedder`], which
//! calls the Ollama embeddings API with bounded retry and backoff.
//!
//! The vector helpers the index backends share live here too:
//! [`cosine_similarity`] for scoring, and [`vec_to_blob`]/[`blob_to_vec`]
//! for round-tripping embeddings through SQLite BLOB columns.
//!
//! # Retry Strategy
//!
//! Only connection failures and timeouts ([`RagError::ProviderUnavailable`])
//! are retried, with exponential backoff (1s, 2s, 4s, ...). A non-2xx status
//! or a malformed body ([`RagError::ProviderError`]) fails immediately, and a
//! returned vector whose length differs from the configured dimension is a
//! fatal [`RagError::DimensionMismatch`] — never silently coerced.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{RagError, Result};

/// Converts text to fixed-dimension dense vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, order-preserving and 1:1 with the input.
    ///
    /// A failure reports the index of the text that failed so the caller can
    /// mark the parent document `Failed` instead of storing partial data.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// The embedding vector dimensionality every result must match.
    fn dims(&self) -> usize;

    /// The model identifier (e.g. `"nomic-embed-text"`).
    fn model_name(&self) -> &str;
}

/// Embedding provider backed by the Ollama `/api/embeddings` endpoint.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dims: usize,
    max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::ProviderError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dims: config.dims,
            max_retries: config.max_retries,
        })
    }

    /// One embedding call, retried on transport errors only.
    async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": text,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(format!("{}/api/embeddings", self.base_url))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        let body_text = response.text().await.unwrap_or_default();
                        return Err(RagError::ProviderError(format!(
                            "embedding API returned {}: {}",
                            status, body_text
                        )));
                    }

                    match response.json::<serde_json::Value>().await {
                        Ok(json) => {
                            let vec = parse_embedding_response(&json)?;
                            if vec.len() != self.dims {
                                return Err(RagError::DimensionMismatch {
                                    expected: self.dims,
                                    got: vec.len(),
                                });
                            }
                            return Ok(vec);
                        }
                        // A timeout can also fire mid-body; that is transport
                        // trouble, retried like a failed connect.
                        Err(e) if e.is_timeout() || e.is_connect() => {
                            last_err = Some(RagError::ProviderUnavailable(e.to_string()));
                        }
                        Err(e) => return Err(RagError::ProviderError(e.to_string())),
                    }
                }
                Err(e) => {
                    // Connect error or timeout; eligible for retry.
                    last_err = Some(RagError::ProviderUnavailable(e.to_string()));
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| RagError::ProviderUnavailable("embedding failed".to_string())))
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_with_retry(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // The Ollama embeddings endpoint takes a single prompt, so a batch is
        // one call per text. The failing index is attached to the error.
        let mut out = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            let vec = self.embed_with_retry(text).await.map_err(|e| match e {
                RagError::ProviderUnavailable(msg) => {
                    RagError::ProviderUnavailable(format!("batch index {}: {}", i, msg))
                }
                RagError::ProviderError(msg) => {
                    RagError::ProviderError(format!("batch index {}: {}", i, msg))
                }
                other => other,
            })?;
            out.push(vec);
        }
        Ok(out)
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Extract the `embedding` array from an Ollama response body. Any
/// non-numeric entry makes the whole response malformed.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("embedding")
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            RagError::ProviderError("invalid embedding response: missing embedding".to_string())
        })?;

    embedding
        .iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                RagError::ProviderError(format!(
                    "invalid embedding response: non-numeric entry {}",
                    v
                ))
            })
        })
        .collect()
}

/// Flatten an embedding into bytes for a SQLite BLOB column: 4 little-endian
/// bytes per `f32`, in vector order.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Inverse of [`vec_to_blob`]. Trailing bytes that do not fill a whole `f32`
/// are dropped.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`, higher meaning closer. Mismatched
/// lengths and zero-norm inputs score `0.0` rather than erroring, since both
/// only arise from corrupt stored vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![0.25f32, -8.5, 1024.0, -0.0625];
        let blob = vec_to_blob(&vec);
        assert_eq!(blob.len(), 16);
        assert_eq!(blob_to_vec(&blob), vec);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![3.0, -1.0, 2.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_scale_invariant() {
        let a = vec![0.3, 0.7, -0.2];
        let b: Vec<f32> = a.iter().map(|x| x * 10.0).collect();
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![0.0, 4.0];
        let b = vec![7.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![2.0, -3.0];
        let b = vec![-2.0, 3.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_parse_embedding_response() {
        let json = serde_json::json!({ "embedding": [0.1, 0.2, 0.3] });
        let vec = parse_embedding_response(&json).unwrap();
        assert_eq!(vec.len(), 3);
        assert!((vec[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_parse_missing_embedding_is_provider_error() {
        let json = serde_json::json!({ "error": "model not found" });
        let err = parse_embedding_response(&json).unwrap_err();
        assert!(matches!(err, RagError::ProviderError(_)));
    }

    #[test]
    fn test_parse_non_numeric_entry_is_provider_error() {
        let json = serde_json::json!({ "embedding": [0.1, "oops", 0.3] });
        let err = parse_embedding_response(&json).unwrap_err();
        assert!(matches!(err, RagError::ProviderError(_)));
    }

    #[tokio::test]
    async fn test_body_read_timeout_is_provider_unavailable() {
        use std::io::Write;
        use std::net::TcpListener;

        // Sends headers, then stalls: the client timeout fires while the
        // body is being read, not on connect.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let _ = stream.write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 4096\r\n\r\n{\"embedding\"",
                );
                std::thread::sleep(std::time::Duration::from_secs(5));
            }
        });

        let embedder = OllamaEmbedder::new(&EmbeddingConfig {
            base_url: format!("http://{}", addr),
            model: "nomic-embed-text".to_string(),
            dims: 3,
            max_retries: 0,
            timeout_secs: 1,
        })
        .unwrap();

        let err = embedder.embed("stalls forever").await.unwrap_err();
        assert!(
            matches!(err, RagError::ProviderUnavailable(_)),
            "got {:?}",
            err
        );
    }
}
