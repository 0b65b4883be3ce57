//! Embed/store collaborator
//!
//! The embedding model and vector database live behind an HTTP gateway
//! with three operations: batch document upsert, similarity search, and a
//! health probe. The trait keeps the pipeline independent of the gateway
//! so tests and dry runs can swap in the in-memory implementation.

mod http;
mod memory;

pub use http::HttpVectorStore;
pub use memory::MemoryVectorStore;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed store response: {0}")]
    InvalidResponse(String),

    #[error("store health check failed: {0}")]
    Unhealthy(String),
}

/// Outcome of one batch upsert
#[derive(Debug, Clone, Default)]
pub struct StoreReceipt {
    pub count: usize,
    pub ids: Vec<String>,
}

/// One similarity-search result
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub content: String,
    pub score: f32,
    pub metadata: serde_json::Value,
}

/// Batch embed-and-upsert plus similarity search
///
/// Implementations must accept an empty batch as a no-op and must keep
/// `texts` and `metadatas` aligned by position.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn add_texts(
        &self,
        texts: &[String],
        metadatas: &[serde_json::Value],
    ) -> Result<StoreReceipt, StoreError>;

    async fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
