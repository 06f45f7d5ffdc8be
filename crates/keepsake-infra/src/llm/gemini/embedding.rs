//! GeminiEmbedder -- concrete [`Embedder`] implementation using
//! `batchEmbedContents`.
//!
//! Embeds batches of texts with text-embedding-004 (768-dimensional
//! vectors). Failures map to [`EmbeddingError::Service`]; callers treat
//! them as "embedding capability unavailable" and fall back.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use keepsake_core::embedding::embedder::Embedder;
use keepsake_types::error::EmbeddingError;

use super::types::{BatchEmbedRequest, BatchEmbedResponse, EmbedContentRequest, GeminiContent};

/// Output dimensionality of text-embedding-004.
const EMBEDDING_DIMENSION: usize = 768;

/// Gemini REST embedder.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl GeminiEmbedder {
    /// Create a new Gemini embedder.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Gemini API key wrapped in SecretString
    /// * `model` - Embedding model identifier (e.g. "text-embedding-004")
    pub fn new(api_key: SecretString, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model,
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:batchEmbedContents",
            self.base_url, self.model
        )
    }

    fn build_request(&self, texts: &[String]) -> BatchEmbedRequest {
        BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: format!("models/{}", self.model),
                    content: GeminiContent::text(None, text),
                })
                .collect(),
        }
    }
}

impl Embedder for GeminiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = self.build_request(texts);

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Service(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Service(format!(
                "HTTP {status}: {error_body}"
            )));
        }

        let parsed: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Service(format!("failed to parse response: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(EmbeddingError::BatchSizeMismatch {
                expected: texts.len(),
                got: parsed.embeddings.len(),
            });
        }

        Ok(parsed
            .embeddings
            .into_iter()
            .map(|embedding| embedding.values)
            .collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_embedder() -> GeminiEmbedder {
        GeminiEmbedder::new(
            SecretString::from("test-key-not-real"),
            "text-embedding-004".to_string(),
        )
    }

    #[test]
    fn test_model_name_and_dimension() {
        let embedder = make_embedder();
        assert_eq!(embedder.model_name(), "text-embedding-004");
        assert_eq!(embedder.dimension(), 768);
    }

    #[test]
    fn test_url_building() {
        let embedder = make_embedder().with_base_url("http://localhost:9090".to_string());
        assert_eq!(
            embedder.url(),
            "http://localhost:9090/v1beta/models/text-embedding-004:batchEmbedContents"
        );
    }

    #[test]
    fn test_build_request_one_entry_per_text() {
        let embedder = make_embedder();
        let request = embedder.build_request(&[
            "Childhood: Grew up in Odense".to_string(),
            "Career: Worked as a fisherman".to_string(),
        ]);
        assert_eq!(request.requests.len(), 2);
        assert_eq!(request.requests[0].model, "models/text-embedding-004");
        assert_eq!(
            request.requests[1].content.joined_text(),
            "Career: Worked as a fisherman"
        );
    }

    #[tokio::test]
    async fn test_empty_batch_short_circuits() {
        let embedder = make_embedder();
        // No HTTP call is made for an empty batch, so no network is needed.
        let vectors = embedder.embed(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
