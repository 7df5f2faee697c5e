//! Vector index provider trait
//!
//! The index embeds text itself (it is configured with an embedding model on
//! the hosted side); this service only ever hands it raw text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metadata attached to every vector entry. `owner_id` is the multi-tenancy
/// key: queries filter on it server-side, and the retriever re-checks it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VectorMetadata {
    pub storage_key: String,
    pub segment_index: u32,
    pub owner_id: String,
}

/// One entry to upsert, keyed by `storage_key::segment_index`
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub text: String,
    pub metadata: VectorMetadata,
}

/// One ranked match returned by a query
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub id: String,
    /// Similarity score, higher is more similar
    pub score: f32,
    /// The stored text of the matched entry
    pub text: String,
    pub metadata: VectorMetadata,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `RestVectorIndex`: hosted auto-embedding index over REST
/// - `MemoryVectorIndex`: in-memory index for the local backend and tests
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace one entry. Re-upserting an id is last-write-wins
    /// and never creates a duplicate.
    async fn upsert(&self, record: &VectorRecord) -> Result<()>;

    /// Nearest-neighbour search by text. `owner_filter` is applied
    /// server-side where the backend supports metadata filters.
    async fn query(
        &self,
        text: &str,
        top_k: usize,
        owner_filter: Option<&str>,
    ) -> Result<Vec<VectorMatch>>;

    /// Delete entries by id. Missing ids are ignored.
    async fn delete(&self, ids: &[String]) -> Result<()>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
