//! Response generation backend.
//!
//! The chat layer only knows the [`ChatBackend`] trait: one call that turns a
//! question plus prior transcript text into a reply, and one that compresses
//! transcript text. [`RagBackend`] is the production implementation.

mod rag;

pub use rag::{RagBackend, SUMMARY_SYSTEM_PROMPT, SYSTEM_PROMPT};

use crate::error::Result;

/// Host-side operations the chat layer invokes.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync + std::fmt::Debug {
    /// Produce the bot reply for `question` given the prior chat history.
    ///
    /// The reply may contain markup.
    async fn generate_response(&self, question: &str, chat_history: &str) -> Result<String>;

    /// Compress transcript text before it is handed to
    /// [`generate_response`](Self::generate_response).
    async fn summarize(&self, chat_history: &str) -> Result<String>;
}
