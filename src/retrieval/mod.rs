//! Vector retrieval over the rug knowledge base.
//!
//! Documents live in a Qdrant collection; each point carries a
//! `page_content` chunk and source [`Metadata`]. [`Retriever`] runs a
//! similarity search for a query embedding and joins the matching chunks into
//! one context string for the prompt.

pub mod qdrant;

pub use qdrant::{
    KeywordMatch, Metadata, NamedVector, Payload, PointFilter, QdrantClient, ScrollRequest,
    SearchRequest,
};

use tracing::debug;

use crate::config::RetrievalConfig;
use crate::error::Result;

/// Similarity search over one collection.
#[derive(Debug, Clone)]
pub struct Retriever {
    client: QdrantClient,
    collection: String,
    vector_name: String,
    limit: u32,
    threshold: f32,
}

impl Retriever {
    /// Build a retriever from configuration.
    pub fn new(http: reqwest::Client, config: &RetrievalConfig) -> Result<Self> {
        Ok(Self {
            client: QdrantClient::new(http, &config.qdrant_url)?,
            collection: config.collection.clone(),
            vector_name: config.vector_name.clone(),
            limit: config.limit,
            threshold: config.threshold,
        })
    }

    /// Underlying Qdrant client.
    #[must_use]
    pub fn client(&self) -> &QdrantClient {
        &self.client
    }

    /// Build the search request for `embedding`.
    #[must_use]
    pub fn search_request(&self, embedding: Vec<f32>) -> SearchRequest {
        SearchRequest {
            vector: NamedVector {
                name: self.vector_name.clone(),
                vector: embedding,
            },
            limit: self.limit,
            score_threshold: Some(self.threshold),
            filter: None,
            with_payload: true,
        }
    }

    /// Page contents of the closest points, newline separated.
    ///
    /// Returns an empty string when nothing clears the threshold.
    pub async fn retrieve(&self, embedding: Vec<f32>) -> Result<String> {
        let request = self.search_request(embedding);
        let hits = self.client.search(&self.collection, &request).await?;

        debug!(
            name: "retrieval.search.completed",
            collection = %self.collection,
            hits = hits.len(),
            "Vector search completed"
        );

        Ok(hits
            .iter()
            .map(|hit| hit.payload.page_content.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
