//! Document and segment types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Media types accepted for upload.
///
/// Dispatch is on the declared media type, not the filename extension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// PDF document (one segment per page)
    Pdf,
    /// Plain text (single segment)
    Text,
    /// Word document, .docx (single segment)
    Docx,
    /// JPEG image, text recovered via OCR (single segment)
    Jpeg,
    /// PNG image, text recovered via OCR (single segment)
    Png,
}

impl MediaType {
    /// Map a declared MIME type onto the allow-list. `None` means the type is
    /// unsupported and the upload must be rejected before any side effect.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "application/pdf" => Some(Self::Pdf),
            "text/plain" => Some(Self::Text),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Canonical MIME string
    pub fn as_mime(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Text => "text/plain",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Whether extraction goes through the OCR service
    pub fn needs_ocr(&self) -> bool {
        matches!(self, Self::Jpeg | Self::Png)
    }
}

/// An uploaded document. Created on upload, never mutated except for renames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document id
    pub id: Uuid,
    /// Owner identity id
    pub owner_id: String,
    /// Original filename as uploaded
    pub filename: String,
    /// Object storage key, derived from owner and filename
    pub storage_key: String,
    /// Declared media type
    pub media_type: MediaType,
    /// Size in bytes
    pub size_bytes: u64,
    /// Content hash of the extracted text (sha256 hex)
    pub content_hash: String,
    /// Number of chunks produced at ingest time
    pub segment_count: u32,
    /// Upload timestamp
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Storage key for an owner/filename pair
    pub fn storage_key_for(owner_id: &str, filename: &str) -> String {
        format!("{}/{}", owner_id, filename)
    }

    /// Vector entry id for one segment of this document
    pub fn segment_id(storage_key: &str, index: u32) -> String {
        format!("{}::{}", storage_key, index)
    }
}

/// A chunk of extracted text, the unit handed to the indexer.
///
/// The chunker's external contract: an ordered sequence of `{index, text}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkText {
    /// Ordinal index within the document
    pub index: u32,
    /// Chunk text
    pub text: String,
}

/// Indexing status of one segment, tracked for resumability and cleanup
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    /// Upsert not yet attempted or in flight
    Pending,
    /// Upsert confirmed by the vector index
    Indexed,
    /// Upsert failed; eligible for reindex
    Failed,
    /// Document deleted but the vector entry could not be removed yet;
    /// the cleanup sweeper retries these
    PendingCleanup,
}

impl SegmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Indexed => "indexed",
            Self::Failed => "failed",
            Self::PendingCleanup => "pending_cleanup",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "indexed" => Some(Self::Indexed),
            "failed" => Some(Self::Failed),
            "pending_cleanup" => Some(Self::PendingCleanup),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_covers_exactly_five_types() {
        assert_eq!(MediaType::from_mime("application/pdf"), Some(MediaType::Pdf));
        assert_eq!(MediaType::from_mime("text/plain"), Some(MediaType::Text));
        assert_eq!(
            MediaType::from_mime(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            ),
            Some(MediaType::Docx)
        );
        assert_eq!(MediaType::from_mime("image/jpeg"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_mime("image/png"), Some(MediaType::Png));

        assert_eq!(MediaType::from_mime("video/mp4"), None);
        assert_eq!(MediaType::from_mime("application/zip"), None);
        assert_eq!(MediaType::from_mime("text/html"), None);
    }

    #[test]
    fn segment_ids_are_deterministic() {
        let key = Document::storage_key_for("user-1", "notes.pdf");
        assert_eq!(key, "user-1/notes.pdf");
        assert_eq!(Document::segment_id(&key, 0), "user-1/notes.pdf::0");
        assert_eq!(Document::segment_id(&key, 7), "user-1/notes.pdf::7");
    }

    #[test]
    fn segment_status_round_trips() {
        for status in [
            SegmentStatus::Pending,
            SegmentStatus::Indexed,
            SegmentStatus::Failed,
            SegmentStatus::PendingCleanup,
        ] {
            assert_eq!(SegmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SegmentStatus::parse("bogus"), None);
    }
}
