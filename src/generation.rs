//! Generation provider abstraction and the Ollama implementation.
//!
//! [`OllamaGenerator`] sends the assembled prompt to the Ollama
//! `/api/generate` endpoint (non-streaming) and returns the model's text
//! unmodified — no truncation, no post-processing.
//!
//! The retry machinery mirrors the embedding client's, but
//! `generation.max_retries` defaults to 0: re-sending a language-model call
//! duplicates cost, so operators must opt in explicitly.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::{RagError, Result};

/// Sends a prompt to an external language model and returns its answer.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// The model identifier (e.g. `"llama3"`).
    fn model_name(&self) -> &str;
}

/// Generation provider backed by the Ollama `/api/generate` endpoint.
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_retries: u32,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::ProviderError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl GenerationProvider for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(format!("{}/api/generate", self.base_url))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        let body_text = response.text().await.unwrap_or_default();
                        return Err(RagError::ProviderError(format!(
                            "generation API returned {}: {}",
                            status, body_text
                        )));
                    }

                    match response.json::<serde_json::Value>().await {
                        Ok(json) => {
                            return json
                                .get("response")
                                .and_then(|r| r.as_str())
                                .map(|s| s.to_string())
                                .ok_or_else(|| {
                                    RagError::ProviderError(
                                        "invalid generation response: missing response field"
                                            .to_string(),
                                    )
                                });
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
                    last_err = Some(RagError::ProviderUnavailable(e.to_string()));
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| RagError::ProviderUnavailable("generation failed".to_string())))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
