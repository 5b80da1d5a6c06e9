//! Error types for the chat layer and its backend.

use std::time::Duration;

use thiserror::Error;

/// Errors produced while resolving a chat turn.
#[derive(Error, Debug)]
pub enum ChatError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An upstream API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// The model returned no choices or an empty message.
    #[error("Completion returned no content")]
    EmptyCompletion,

    /// The embeddings endpoint returned no vectors.
    #[error("Embedding response contained no data")]
    EmptyEmbedding,

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A backend call did not finish within the configured limit.
    #[error("Backend call timed out after {0:?}")]
    Timeout(Duration),

    /// The turn worker is gone and can no longer accept or answer turns.
    #[error("Turn queue closed")]
    QueueClosed,
}

/// Result type alias for chat operations.
pub type Result<T> = std::result::Result<T, ChatError>;
