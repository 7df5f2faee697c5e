//! Text extraction from uploaded files
//!
//! Converts a raw byte buffer plus its declared media type into plain text
//! segments: one per page for PDFs, a single segment for everything else.
//! Decoding is delegated to format-specific libraries; images go through a
//! remote OCR service. Every path runs under a bounded timeout.

pub mod chunker;
mod docx;
mod ocr;
mod pdf;

pub use chunker::TextChunker;
pub use ocr::OcrClient;

use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::types::document::MediaType;

/// Extracted plain text, one entry per page/segment
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub segments: Vec<String>,
}

impl ExtractedText {
    fn single(text: String) -> Self {
        Self {
            segments: vec![text],
        }
    }

    /// Content hash over the extracted text (sha256 hex)
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for segment in &self.segments {
            hasher.update(segment.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Media-type-dispatched text extractor
pub struct Extractor {
    ocr: OcrClient,
    pdf_timeout: Duration,
}

impl Extractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            ocr: OcrClient::new(config),
            pdf_timeout: Duration::from_secs(config.pdf_timeout_secs),
        }
    }

    /// Extract plain text from a byte buffer.
    ///
    /// The media type has already passed the allow-list; anything that fails
    /// here is a decode problem, not an unsupported type.
    pub async fn extract(&self, data: &[u8], media_type: MediaType) -> Result<ExtractedText> {
        match media_type {
            MediaType::Pdf => {
                let data = data.to_vec();
                let pages = tokio::time::timeout(
                    self.pdf_timeout,
                    tokio::task::spawn_blocking(move || pdf::extract_pages(&data)),
                )
                .await
                .map_err(|_| Error::decode("pdf", "extraction timed out"))?
                .map_err(|e| Error::Internal(format!("extraction task failed: {}", e)))??;
                Ok(ExtractedText { segments: pages })
            }
            MediaType::Text => {
                let text = std::str::from_utf8(data)
                    .map_err(|e| Error::decode("text", format!("invalid UTF-8: {}", e)))?;
                Ok(ExtractedText::single(text.trim().to_string()))
            }
            MediaType::Docx => {
                let data = data.to_vec();
                let text = tokio::task::spawn_blocking(move || docx::extract_text(&data))
                    .await
                    .map_err(|e| Error::Internal(format!("extraction task failed: {}", e)))??;
                Ok(ExtractedText::single(text))
            }
            MediaType::Jpeg | MediaType::Png => {
                let text = self.ocr.recognize(media_type, data).await?;
                Ok(ExtractedText::single(text))
            }
        }
    }
}
