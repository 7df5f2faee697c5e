//! Configuration for the KolOS backend

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::identity::Identity;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend provider (local or hosted)
    #[serde(default)]
    pub backend: Backend,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Identity provider configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Object storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Vector index configuration
    #[serde(default)]
    pub vector: VectorConfig,
    /// Completion API configuration
    #[serde(default)]
    pub completion: CompletionConfig,
    /// Text chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Extraction configuration
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Indexing configuration
    #[serde(default)]
    pub indexing: IndexingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist. Secrets can be supplied via environment variables
    /// (`KOLOS_COMPLETION_API_KEY`, `KOLOS_VECTOR_TOKEN`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p)
                    .map_err(|e| Error::Config(format!("failed to read {}: {}", p.display(), e)))?;
                toml::from_str(&raw)
                    .map_err(|e| Error::Config(format!("failed to parse {}: {}", p.display(), e)))?
            }
            _ => Self::default(),
        };

        if let Ok(key) = std::env::var("KOLOS_COMPLETION_API_KEY") {
            config.completion.api_key = Some(key);
        }
        if let Ok(token) = std::env::var("KOLOS_VECTOR_TOKEN") {
            config.vector.token = Some(token);
        }

        Ok(config)
    }

    /// Default data directory for the local backend
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kolos")
    }
}

/// Backend provider selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Local backend (filesystem storage + in-memory vector index)
    #[default]
    Local,
    /// Hosted backend (GCS + hosted vector index + remote sessions)
    Hosted,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024,
        }
    }
}

/// Identity provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session endpoint of the hosted identity provider. The bearer token of
    /// each request is forwarded there and resolves to an identity or nothing.
    pub session_url: Option<String>,
    /// Static token -> identity map for the local backend
    #[serde(default)]
    pub static_tokens: HashMap<String, Identity>,
    /// Session lookup timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_url: None,
            static_tokens: HashMap::new(),
            timeout_secs: 10,
        }
    }
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket name (hosted backend)
    pub bucket: String,
    /// Object key prefix
    pub prefix: String,
    /// Directory for the filesystem backend
    pub local_dir: PathBuf,
    /// SQLite database path
    pub database_path: PathBuf,
    /// Signed URL lifetime in seconds. Callers must re-request after expiry.
    pub signed_url_ttl_secs: u64,
    /// Storage operation timeout in seconds
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: "documents/".to_string(),
            local_dir: AppConfig::data_dir().join("objects"),
            database_path: AppConfig::data_dir().join("kolos.db"),
            signed_url_ttl_secs: 60,
            timeout_secs: 30,
        }
    }
}

/// Vector index configuration
///
/// The index embeds text itself; this service never computes embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    /// REST endpoint of the hosted vector index
    pub url: Option<String>,
    /// Bearer token for the hosted vector index
    pub token: Option<String>,
    /// Number of nearest neighbours to retrieve
    pub top_k: usize,
    /// Query/upsert timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            top_k: 5,
            timeout_secs: 30,
        }
    }
}

/// Completion API configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// API key
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Maximum output tokens for chat replies
    pub max_tokens: u32,
    /// Maximum output tokens for structured quiz generation
    pub quiz_max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            model: "openai/gpt-oss-120b".to_string(),
            max_tokens: 1000,
            quiz_max_tokens: 4000,
            timeout_secs: 120,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    /// Minimum chunk size; a trailing window shorter than this merges into
    /// its predecessor. A segment shorter than `chunk_size` always yields
    /// exactly one chunk.
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 200,
            min_chunk_size: 100,
        }
    }
}

/// Extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Timeout for PDF text extraction in seconds
    pub pdf_timeout_secs: u64,
    /// OCR service endpoint for JPEG/PNG uploads
    pub ocr_url: String,
    /// OCR service API key (optional, uses free tier if not set)
    pub ocr_api_key: Option<String>,
    /// OCR request timeout in seconds
    pub ocr_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            pdf_timeout_secs: 60,
            ocr_url: "https://api.unstructured.io/general/v0/general".to_string(),
            ocr_api_key: None,
            ocr_timeout_secs: 120,
        }
    }
}

/// Indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Number of parallel segment upserts (default: CPU count, max 4)
    pub workers: Option<usize>,
    /// Interval of the orphaned-segment cleanup sweeper in seconds
    pub cleanup_interval_secs: u64,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            workers: None,
            cleanup_interval_secs: 300,
        }
    }
}

impl IndexingConfig {
    /// Effective worker count
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| num_cpus::get().min(4)).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.backend, Backend::Local);
        assert_eq!(config.vector.top_k, 5);
        assert_eq!(config.completion.max_tokens, 1000);
        assert_eq!(config.storage.signed_url_ttl_secs, 60);
        assert!(config.indexing.worker_count() >= 1);
    }

    #[test]
    fn parses_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            backend = "hosted"

            [server]
            host = "127.0.0.1"
            port = 9000
            enable_cors = false
            max_upload_size = 1048576

            [vector]
            url = "https://vectors.example.com"
            top_k = 3
            timeout_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.backend, Backend::Hosted);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.vector.top_k, 3);
        // Unspecified sections fall back to defaults
        assert_eq!(config.completion.max_tokens, 1000);
    }
}
