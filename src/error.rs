//! Error types for the KolOS backend

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Result type alias for KolOS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur across the ingestion, retrieval, and generation paths
#[derive(Error, Debug)]
pub enum Error {
    /// Declared media type is not on the upload allow-list
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Input bytes could not be decoded as the declared format
    #[error("failed to decode {format}: {reason}")]
    Decode { format: &'static str, reason: String },

    /// Object storage put/get/delete error
    #[error("storage error: {0}")]
    Storage(String),

    /// Vector upsert error (per-segment, non-fatal to sibling segments)
    #[error("index error: {0}")]
    Index(String),

    /// Vector query error
    #[error("retrieval error: {0}")]
    Retrieval(String),

    /// Completion call errored or returned no content
    #[error("completion error: {0}")]
    Completion(String),

    /// Structured completion output did not match the expected schema
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    /// Caller is not the owner of the addressed resource, or not authenticated
    #[error("not authorized")]
    NotAuthorized,

    /// Resource does not exist (or is owned by someone else)
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input provided
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Decode failure for a named format
    pub fn decode(format: &'static str, reason: impl Into<String>) -> Self {
        Self::Decode {
            format,
            reason: reason.into(),
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Decode { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::SchemaValidation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Storage(_) | Self::Index(_) | Self::Retrieval(_) | Self::Completion(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::NotAuthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("serialization error: {}", e))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            Error::UnsupportedMediaType("video/mp4".into()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            Error::decode("pdf", "truncated").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            Error::Completion("empty choices".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(Error::NotAuthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::NotFound("quiz".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
