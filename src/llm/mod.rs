//! LLM clients.
//!
//! Thin clients for OpenAI-compatible endpoints: chat completions for the
//! answer and summary calls, and embeddings for vector retrieval.
//!
//! # Example
//!
//! ```rust,ignore
//! use rug_sage::llm::{ChatCompletionsClient, MessageRole};
//! use rug_sage::prompt::Prompt;
//!
//! let client = ChatCompletionsClient::with_http(reqwest::Client::new(), settings);
//! let question = Prompt::new("What is a kilim?", MessageRole::User).to_message();
//! let reply = client.complete(&[question], 0.5).await?;
//! ```

pub mod chat_completions;
pub mod embeddings;
pub mod provider;

pub use chat_completions::ChatCompletionsClient;
pub use embeddings::EmbeddingsClient;
pub use provider::Provider;

use serde::{Deserialize, Serialize};

/// LLM connection and model settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Base URL for the LLM API (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Chat model identifier (e.g., `gpt-4o`).
    pub model: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Provider type (auto-detected from `base_url` if not specified).
    pub provider: Provider,
}

/// A message in a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message author.
    pub role: MessageRole,
    /// Text content.
    pub content: String,
}

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System prompt.
    System,
    /// User message.
    User,
    /// Assistant response.
    Assistant,
}

/// Attach the provider's authentication header to a request.
pub(crate) fn authorize(
    rb: reqwest::RequestBuilder,
    settings: &LlmSettings,
) -> reqwest::RequestBuilder {
    match &settings.api_key {
        Some(key) if settings.provider.uses_api_key_header() => rb.header("api-key", key),
        Some(key) => rb.bearer_auth(key),
        None => rb,
    }
}

/// Turn a non-success response into [`ChatError::Api`](crate::error::ChatError::Api).
pub(crate) async fn check_status(
    resp: reqwest::Response,
) -> crate::error::Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(crate::error::ChatError::Api {
        status: status.as_u16(),
        message,
    })
}
