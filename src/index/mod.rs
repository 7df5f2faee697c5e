//! Segment indexing with bounded concurrency and per-segment status
//!
//! Upserts are keyed `storage_key::segment_index`, which makes re-upserting
//! idempotent (last-write-wins). There is no rollback across siblings: a
//! failed segment never undoes its neighbours, it is recorded and retried
//! through `reindex_failed`.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;
use crate::providers::vector_index::{VectorIndex, VectorMetadata, VectorRecord};
use crate::storage::Database;
use crate::types::document::{ChunkText, Document, SegmentStatus};

/// Outcome of one indexing pass over a document
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub total: usize,
    pub indexed: usize,
    /// Indices of segments whose upsert failed; eligible for reindex
    pub failed: Vec<u32>,
}

impl IndexReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Upsert a single owned record, tagging the result with its segment index.
/// Extracted into a named async fn so the future it produces has a concrete
/// lifetime, which `buffer_unordered` requires over a trait-object upsert.
async fn upsert_record(vector: Arc<dyn VectorIndex>, record: VectorRecord) -> (u32, Result<()>) {
    let index = record.metadata.segment_index;
    let result = vector.upsert(&record).await;
    (index, result)
}

/// Indexer over the injected vector index
pub struct Indexer {
    vector: Arc<dyn VectorIndex>,
    db: Database,
    workers: usize,
}

impl Indexer {
    pub fn new(vector: Arc<dyn VectorIndex>, db: Database, workers: usize) -> Self {
        Self {
            vector,
            db,
            workers: workers.max(1),
        }
    }

    /// Upsert every chunk of a document. Per-segment failures are recorded
    /// and reported, not propagated; the pass itself only fails on database
    /// errors.
    pub async fn index_document(&self, doc: &Document, chunks: &[ChunkText]) -> Result<IndexReport> {
        let indices: Vec<u32> = chunks.iter().map(|c| c.index).collect();
        self.db.record_segments(&doc.storage_key, &doc.owner_id, &indices)?;
        self.upsert_chunks(doc, chunks).await
    }

    /// Re-upsert only the segments whose previous upsert failed
    pub async fn reindex_failed(&self, doc: &Document, chunks: &[ChunkText]) -> Result<IndexReport> {
        let failed: HashSet<u32> = self.db.failed_segments(&doc.storage_key)?.into_iter().collect();
        let retry: Vec<ChunkText> = chunks
            .iter()
            .filter(|c| failed.contains(&c.index))
            .cloned()
            .collect();
        self.upsert_chunks(doc, &retry).await
    }

    async fn upsert_chunks(&self, doc: &Document, chunks: &[ChunkText]) -> Result<IndexReport> {
        let records: Vec<VectorRecord> = chunks
            .iter()
            .map(|chunk| VectorRecord {
                id: Document::segment_id(&doc.storage_key, chunk.index),
                text: chunk.text.clone(),
                metadata: VectorMetadata {
                    storage_key: doc.storage_key.clone(),
                    segment_index: chunk.index,
                    owner_id: doc.owner_id.clone(),
                },
            })
            .collect();

        let vector = Arc::clone(&self.vector);
        let results: Vec<(u32, Result<()>)> = stream::iter(records.into_iter().map(move |record| {
            upsert_record(Arc::clone(&vector), record)
        }))
        .buffer_unordered(self.workers)
        .collect()
        .await;

        let mut report = IndexReport {
            total: chunks.len(),
            indexed: 0,
            failed: Vec::new(),
        };

        for (index, result) in results {
            match result {
                Ok(()) => {
                    self.db
                        .set_segment_status(&doc.storage_key, index, SegmentStatus::Indexed, None)?;
                    report.indexed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "failed to index segment {}::{}: {}",
                        doc.storage_key,
                        index,
                        e
                    );
                    self.db.set_segment_status(
                        &doc.storage_key,
                        index,
                        SegmentStatus::Failed,
                        Some(&e.to_string()),
                    )?;
                    report.failed.push(index);
                }
            }
        }
        report.failed.sort_unstable();

        tracing::info!(
            "indexed {}/{} segments of {}",
            report.indexed,
            report.total,
            doc.storage_key
        );
        Ok(report)
    }

    /// Remove a document's vector entries. Entries that cannot be removed
    /// now are flagged for the cleanup sweeper instead of being orphaned.
    pub async fn remove_document(&self, doc: &Document) -> Result<()> {
        let ids: Vec<String> = self
            .db
            .segment_statuses(&doc.storage_key)?
            .into_iter()
            .map(|(index, _)| Document::segment_id(&doc.storage_key, index))
            .collect();

        match self.vector.delete(&ids).await {
            Ok(()) => {
                self.db.delete_segment_rows(&doc.storage_key)?;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    "vector delete for {} failed, deferring to cleanup sweeper: {}",
                    doc.storage_key,
                    e
                );
                self.db.mark_segments_pending_cleanup(&doc.storage_key)?;
                Ok(())
            }
        }
    }

    /// One pass of the background cleanup sweeper: retry deletion of vector
    /// entries whose document is already gone.
    pub async fn sweep_pending_cleanup(&self, limit: usize) -> Result<usize> {
        let pending = self.db.pending_cleanup_segments(limit)?;
        if pending.is_empty() {
            return Ok(0);
        }

        let mut cleaned = 0;
        for (storage_key, index) in pending {
            let id = Document::segment_id(&storage_key, index);
            match self.vector.delete(std::slice::from_ref(&id)).await {
                Ok(()) => {
                    self.db.delete_segment_row(&storage_key, index)?;
                    cleaned += 1;
                }
                Err(e) => {
                    tracing::warn!("cleanup of {} still failing: {}", id, e);
                }
            }
        }

        if cleaned > 0 {
            tracing::info!("cleanup sweeper removed {} orphaned vector entries", cleaned);
        }
        Ok(cleaned)
    }
}
