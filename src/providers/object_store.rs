//! Object storage provider trait and filesystem implementation

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::StorageConfig;
use crate::error::{Error, Result};

/// Trait for opaque byte-blob storage keyed by string
///
/// Implementations:
/// - `FsObjectStore`: local filesystem (dev/test backend)
/// - `GcsObjectStore`: Google Cloud Storage (hosted backend, `gcp` feature)
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under a key, overwriting any existing object
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()>;

    /// Retrieve the bytes stored under a key
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Delete the object stored under a key. Deleting a missing key is not
    /// an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Short-lived signed URL for a direct client upload
    async fn upload_url(&self, key: &str, ttl: Duration) -> Result<String>;

    /// Short-lived signed URL for a direct client download
    async fn download_url(&self, key: &str, ttl: Duration) -> Result<String>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Filesystem-backed object store for the local backend.
///
/// Keys map onto paths under the configured directory. Signed URLs are a
/// hosted-storage concern and are not available here.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Create a store rooted at the configured local directory
    pub fn new(config: &StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.local_dir).map_err(|e| {
            Error::Storage(format!(
                "failed to create storage dir {}: {}",
                config.local_dir.display(),
                e
            ))
        })?;
        Ok(Self {
            root: config.local_dir.clone(),
        })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        // Keys are owner/filename; refuse anything that escapes the root.
        if key.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(Error::Storage(format!("invalid storage key: {}", key)));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, data: &[u8], _content_type: &str) -> Result<()> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("failed to create {}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| Error::Storage(format!("failed to write {}: {}", key, e)))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::Storage(format!("failed to read {}: {}", key, e)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.object_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("failed to delete {}: {}", key, e))),
        }
    }

    async fn upload_url(&self, _key: &str, _ttl: Duration) -> Result<String> {
        Err(Error::Storage(
            "signed upload URLs require the hosted storage backend".to_string(),
        ))
    }

    async fn download_url(&self, _key: &str, _ttl: Duration) -> Result<String> {
        Err(Error::Storage(
            "signed download URLs require the hosted storage backend".to_string(),
        ))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.root.is_dir())
    }

    fn name(&self) -> &str {
        "fs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(dir: &std::path::Path) -> FsObjectStore {
        let config = StorageConfig {
            local_dir: dir.to_path_buf(),
            ..Default::default()
        };
        FsObjectStore::new(&config).unwrap()
    }

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        store
            .put("u1/notes.txt", b"hello", "text/plain")
            .await
            .unwrap();
        assert_eq!(store.get("u1/notes.txt").await.unwrap(), b"hello");

        store.delete("u1/notes.txt").await.unwrap();
        assert!(store.get("u1/notes.txt").await.is_err());
        // Deleting a missing key is not an error
        store.delete("u1/notes.txt").await.unwrap();
    }

    #[tokio::test]
    async fn put_overwrites_existing_object() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        store.put("u1/a.txt", b"first", "text/plain").await.unwrap();
        store.put("u1/a.txt", b"second", "text/plain").await.unwrap();
        assert_eq!(store.get("u1/a.txt").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn rejects_path_traversal_keys() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        assert!(store.get("../escape").await.is_err());
        assert!(store.put("u1//x", b"", "text/plain").await.is_err());
    }

    #[tokio::test]
    async fn signed_urls_are_unavailable() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        assert!(store
            .upload_url("u1/a.txt", Duration::from_secs(60))
            .await
            .is_err());
    }
}
