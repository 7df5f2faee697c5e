//! In-memory vector index for the local backend and tests
//!
//! Scores by lexical token overlap instead of real embeddings, which is
//! enough to exercise ranking, filtering, and idempotence without a hosted
//! index.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;

use crate::error::Result;
use crate::providers::vector_index::{VectorIndex, VectorMatch, VectorMetadata, VectorRecord};

#[derive(Debug, Clone)]
struct StoredEntry {
    text: String,
    metadata: VectorMetadata,
}

/// In-memory index keyed by entry id
#[derive(Default)]
pub struct MemoryVectorIndex {
    entries: DashMap<String, StoredEntry>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn tokens(text: &str) -> HashSet<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect()
    }

    fn score(query: &HashSet<String>, text: &str) -> f32 {
        if query.is_empty() {
            return 0.0;
        }
        let doc = Self::tokens(text);
        let shared = query.intersection(&doc).count();
        shared as f32 / query.len() as f32
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, record: &VectorRecord) -> Result<()> {
        self.entries.insert(
            record.id.clone(),
            StoredEntry {
                text: record.text.clone(),
                metadata: record.metadata.clone(),
            },
        );
        Ok(())
    }

    async fn query(
        &self,
        text: &str,
        top_k: usize,
        owner_filter: Option<&str>,
    ) -> Result<Vec<VectorMatch>> {
        let query = Self::tokens(text);

        let mut matches: Vec<VectorMatch> = self
            .entries
            .iter()
            .filter(|entry| {
                owner_filter.map_or(true, |owner| entry.value().metadata.owner_id == owner)
            })
            .map(|entry| VectorMatch {
                id: entry.key().clone(),
                score: Self::score(&query, &entry.value().text),
                text: entry.value().text.clone(),
                metadata: entry.value().metadata.clone(),
            })
            .filter(|m| m.score > 0.0)
            .collect();

        // Deterministic ordering: score descending, id as tie-break
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        for id in ids {
            self.entries.remove(id);
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
