//! OpenAI Embeddings API client.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LlmSettings, authorize, check_status};
use crate::error::{ChatError, Result};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingObject>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingObject {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

/// Client for `/v1/embeddings`.
#[derive(Clone)]
pub struct EmbeddingsClient {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for EmbeddingsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingsClient")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.embedding_model)
            .finish_non_exhaustive()
    }
}

impl EmbeddingsClient {
    /// Create a client that reuses an existing HTTP connection pool.
    #[must_use]
    pub fn with_http(http: reqwest::Client, settings: LlmSettings) -> Self {
        Self { http, settings }
    }

    /// Embed `input` with the configured embedding model.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>> {
        let url = self
            .settings
            .provider
            .build_embeddings_url(&self.settings.base_url);
        let body = EmbeddingRequest {
            input,
            model: &self.settings.embedding_model,
        };

        let rb = authorize(self.http.post(&url).json(&body), &self.settings);
        let resp = check_status(rb.send().await?).await?;
        let parsed: EmbeddingResponse = resp.json().await?;

        if let Some(usage) = &parsed.usage {
            debug!(
                name: "llm.embedding.usage",
                total_tokens = usage.total_tokens,
                "Embedding computed"
            );
        }

        first_embedding(parsed)
    }
}

fn first_embedding(resp: EmbeddingResponse) -> Result<Vec<f32>> {
    resp.data
        .into_iter()
        .next()
        .map(|obj| obj.embedding)
        .filter(|v| !v.is_empty())
        .ok_or(ChatError::EmptyEmbedding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_embedding() {
        let resp: EmbeddingResponse = serde_json::from_str(
            r#"{
                "object": "list",
                "model": "text-embedding-3-large",
                "usage": {"prompt_tokens": 3, "total_tokens": 3},
                "data": [{"object": "embedding", "index": 0, "embedding": [0.1, -0.2, 0.3]}]
            }"#,
        )
        .unwrap();
        assert_eq!(first_embedding(resp).unwrap(), vec![0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_no_data_is_error() {
        let resp: EmbeddingResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(matches!(first_embedding(resp), Err(ChatError::EmptyEmbedding)));
    }
}
