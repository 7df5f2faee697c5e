//! Google Cloud Storage object store (hosted backend)

use async_trait::async_trait;
use std::time::Duration;

use google_cloud_storage::client::{Client as GcsClient, ClientConfig};
use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
use google_cloud_storage::http::objects::download::Range;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::list::ListObjectsRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use google_cloud_storage::sign::{SignedURLMethod, SignedURLOptions};

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::providers::object_store::ObjectStore;

/// Google Cloud Storage object store
pub struct GcsObjectStore {
    client: GcsClient,
    bucket: String,
    prefix: String,
}

impl GcsObjectStore {
    /// Create a new GCS store using application-default credentials
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(Error::Config(
                "hosted backend selected but storage.bucket is empty".to_string(),
            ));
        }

        let client_config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| Error::Config(format!("failed to create GCS client: {}", e)))?;

        Ok(Self {
            client: GcsClient::new(client_config),
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
        })
    }

    fn object_path(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        let object_path = self.object_path(key);
        let mut media = Media::new(object_path);
        media.content_type = content_type.to_string().into();
        let upload_type = UploadType::Simple(media);

        self.client
            .upload_object(
                &UploadObjectRequest {
                    bucket: self.bucket.clone(),
                    ..Default::default()
                },
                data.to_vec(),
                &upload_type,
            )
            .await
            .map(|_| ())
            .map_err(|e| Error::Storage(format!("failed to upload {}: {}", key, e)))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.client
            .download_object(
                &GetObjectRequest {
                    bucket: self.bucket.clone(),
                    object: self.object_path(key),
                    ..Default::default()
                },
                &Range::default(),
            )
            .await
            .map_err(|e| Error::Storage(format!("failed to download {}: {}", key, e)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self
            .client
            .delete_object(&DeleteObjectRequest {
                bucket: self.bucket.clone(),
                object: self.object_path(key),
                ..Default::default()
            })
            .await
        {
            Ok(()) => Ok(()),
            // Missing objects count as deleted
            Err(e) if e.to_string().contains("404") => Ok(()),
            Err(e) => Err(Error::Storage(format!("failed to delete {}: {}", key, e))),
        }
    }

    async fn upload_url(&self, key: &str, ttl: Duration) -> Result<String> {
        self.client
            .signed_url(
                &self.bucket,
                &self.object_path(key),
                None,
                None,
                SignedURLOptions {
                    method: SignedURLMethod::PUT,
                    expires: ttl,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| Error::Storage(format!("failed to sign upload URL for {}: {}", key, e)))
    }

    async fn download_url(&self, key: &str, ttl: Duration) -> Result<String> {
        self.client
            .signed_url(
                &self.bucket,
                &self.object_path(key),
                None,
                None,
                SignedURLOptions {
                    method: SignedURLMethod::GET,
                    expires: ttl,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| Error::Storage(format!("failed to sign download URL for {}: {}", key, e)))
    }

    async fn health_check(&self) -> Result<bool> {
        self.client
            .list_objects(&ListObjectsRequest {
                bucket: self.bucket.clone(),
                max_results: Some(1),
                ..Default::default()
            })
            .await
            .map(|_| true)
            .map_err(|e| Error::Storage(format!("GCS health check failed: {}", e)))
    }

    fn name(&self) -> &str {
        "gcs"
    }
}
