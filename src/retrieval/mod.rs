//! Owner-scoped context retrieval
//!
//! The single multi-tenancy enforcement point of the whole service: the
//! vector query carries a server-side owner filter, and every returned match
//! is re-checked against the caller before its text can reach a prompt.

use std::sync::Arc;

use crate::error::Result;
use crate::providers::vector_index::VectorIndex;

/// Separator between concatenated chunk texts
const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Retriever over the injected vector index
pub struct Retriever {
    vector: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl Retriever {
    pub fn new(vector: Arc<dyn VectorIndex>, top_k: usize) -> Self {
        Self { vector, top_k }
    }

    /// Retrieve context for a query as the given owner.
    ///
    /// Returns the matched chunk texts joined in similarity order, or an
    /// empty string when nothing matches. Callers must treat "no context" as
    /// a valid, silent outcome.
    pub async fn retrieve(&self, query: &str, owner_id: &str) -> Result<String> {
        let matches = self.vector.query(query, self.top_k, Some(owner_id)).await?;

        let texts: Vec<&str> = matches
            .iter()
            .filter(|m| {
                // The filter already ran server-side; a mismatch here means a
                // misbehaving index and the entry must never reach the caller.
                if m.metadata.owner_id == owner_id {
                    true
                } else {
                    tracing::warn!(
                        "vector index returned foreign-owner entry {} for owner {}",
                        m.id,
                        owner_id
                    );
                    false
                }
            })
            .map(|m| m.text.as_str())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(texts.join(CONTEXT_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::memory_index::MemoryVectorIndex;
    use crate::providers::vector_index::{VectorIndex, VectorMatch, VectorMetadata, VectorRecord};
    use async_trait::async_trait;

    async fn seed(index: &MemoryVectorIndex, id: &str, text: &str, owner: &str) {
        let (key, segment) = id.rsplit_once("::").unwrap();
        index
            .upsert(&VectorRecord {
                id: id.to_string(),
                text: text.to_string(),
                metadata: VectorMetadata {
                    storage_key: key.to_string(),
                    segment_index: segment.parse().unwrap(),
                    owner_id: owner.to_string(),
                },
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn returns_matching_context_for_owner() {
        let index = Arc::new(MemoryVectorIndex::new());
        seed(
            &index,
            "u1/bio.txt::0",
            "Photosynthesis converts light to energy.",
            "u1",
        )
        .await;

        let retriever = Retriever::new(index, 5);
        let context = retriever.retrieve("What is photosynthesis?", "u1").await.unwrap();
        assert!(context.contains("Photosynthesis converts light to energy."));
    }

    #[tokio::test]
    async fn empty_context_is_a_valid_silent_outcome() {
        let index = Arc::new(MemoryVectorIndex::new());
        let retriever = Retriever::new(index, 5);
        let context = retriever.retrieve("What is photosynthesis?", "u2").await.unwrap();
        assert_eq!(context, "");
    }

    #[tokio::test]
    async fn never_returns_another_owners_chunks() {
        let index = Arc::new(MemoryVectorIndex::new());
        seed(
            &index,
            "u2/bio.txt::0",
            "Photosynthesis converts light to energy.",
            "u2",
        )
        .await;
        // Identical text for u1 so similarity cannot tell the owners apart
        seed(&index, "u1/bio.txt::0", "Photosynthesis basics.", "u1").await;

        let retriever = Retriever::new(index, 5);
        let context = retriever.retrieve("photosynthesis", "u1").await.unwrap();
        assert!(context.contains("Photosynthesis basics."));
        assert!(!context.contains("converts light to energy"));
    }

    /// Index that ignores the server-side owner filter
    struct LeakyIndex {
        inner: MemoryVectorIndex,
    }

    #[async_trait]
    impl VectorIndex for LeakyIndex {
        async fn upsert(&self, record: &VectorRecord) -> Result<()> {
            self.inner.upsert(record).await
        }

        async fn query(
            &self,
            text: &str,
            top_k: usize,
            _owner_filter: Option<&str>,
        ) -> Result<Vec<VectorMatch>> {
            self.inner.query(text, top_k, None).await
        }

        async fn delete(&self, ids: &[String]) -> Result<()> {
            self.inner.delete(ids).await
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "leaky"
        }
    }

    #[tokio::test]
    async fn post_filter_drops_foreign_entries_from_a_misbehaving_index() {
        let leaky = LeakyIndex {
            inner: MemoryVectorIndex::new(),
        };
        seed(
            &leaky.inner,
            "u2/bio.txt::0",
            "Photosynthesis converts light to energy.",
            "u2",
        )
        .await;

        let retriever = Retriever::new(Arc::new(leaky), 5);
        let context = retriever.retrieve("photosynthesis", "u1").await.unwrap();
        assert_eq!(context, "");
    }

    #[tokio::test]
    async fn concatenates_multiple_chunks_with_separator() {
        let index = Arc::new(MemoryVectorIndex::new());
        seed(&index, "u1/bio.txt::0", "Photosynthesis part one.", "u1").await;
        seed(&index, "u1/bio.txt::1", "Photosynthesis part two.", "u1").await;

        let retriever = Retriever::new(index, 5);
        let context = retriever.retrieve("photosynthesis", "u1").await.unwrap();
        assert!(context.contains("\n---\n"));
        assert!(context.contains("part one"));
        assert!(context.contains("part two"));
    }
}
