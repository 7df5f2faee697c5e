//! OCR via a remote parsing service
//!
//! Image uploads are sent to an Unstructured-style endpoint that returns a
//! list of text elements; their texts are joined into one block.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::types::document::MediaType;

/// Client for the OCR/parsing service
pub struct OcrClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct OcrElement {
    text: String,
}

impl OcrClient {
    pub fn new(config: &ExtractionConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ocr_timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            url: config.ocr_url.clone(),
            api_key: config.ocr_api_key.clone(),
        }
    }

    /// Run OCR over an image buffer, returning the recognized text trimmed
    pub async fn recognize(&self, media_type: MediaType, data: &[u8]) -> Result<String> {
        let filename = match media_type {
            MediaType::Jpeg => "upload.jpg",
            MediaType::Png => "upload.png",
            _ => "upload.bin",
        };

        let part = Part::bytes(data.to_vec())
            .file_name(filename)
            .mime_str(media_type.as_mime())
            .map_err(|e| Error::Internal(format!("invalid OCR mime type: {}", e)))?;
        let form = Form::new().part("files", part);

        let mut request = self.client.post(&self.url).multipart(form);
        if let Some(ref api_key) = self.api_key {
            request = request.header("unstructured-api-key", api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Internal(format!("OCR request failed: {}", e)))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::decode(
                "image",
                format!("OCR service rejected the image ({}): {}", status, body),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Internal(format!(
                "OCR service returned {}: {}",
                status, body
            )));
        }

        let elements: Vec<OcrElement> = response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("failed to parse OCR response: {}", e)))?;

        let text = elements
            .into_iter()
            .map(|e| e.text)
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(text.trim().to_string())
    }
}
