//! Rug Sage
//!
//! A desktop chat assistant for questions about rugs. The chat layer turns
//! input events into turns, runs each turn against a response backend and
//! renders the exchanged messages into an auto-scrolling HTML history.
//!
//! # Architecture
//!
//! - **Server**: Axum-based HTTP server; the page is driven by HTMX fragments
//! - **Controller**: Input handling and the single-flight turn queue
//! - **Renderer**: Transcript entries to escaped or sanitized HTML
//! - **Backend**: Retrieval-augmented answers (embeddings + Qdrant + chat completions)
//!
//! # Modules
//!
//! - [`transcript`]: Append-only message list
//! - [`controller`]: Send flow and turn serialization
//! - [`render`]: History rendering and markup sanitizing
//! - [`backend`]: The [`backend::ChatBackend`] trait and its RAG implementation
//! - [`llm`]: OpenAI-compatible completion and embedding clients
//! - [`retrieval`]: Qdrant client and retriever

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod render;
pub mod retrieval;
pub mod server;
pub mod telemetry;
pub mod transcript;

use std::sync::Arc;

use backend::ChatBackend;
use config::AppConfig;
use controller::ChatController;
use retrieval::Retriever;
use server::PendingReplies;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Chat controller owning the transcript and turn queue.
    pub controller: ChatController,
    /// Backend for direct command calls.
    pub backend: Arc<dyn ChatBackend>,
    /// Turns waiting for their reply to be fetched.
    pub pending: PendingReplies,
    /// Vector store access, when configured.
    pub retriever: Option<Retriever>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("controller", &self.controller)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}
