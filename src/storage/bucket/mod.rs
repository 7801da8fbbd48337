//! Remote object storage bucket backend.

mod client;
mod signer;

use client::Client;

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::config::BucketConfig;
use crate::error::Result;
use crate::storage::StorageProvider;

/// Bucket-backed storage provider
pub struct BucketStorage {
    config: BucketConfig,
    client: Client,
}

impl BucketStorage {
    pub fn new(config: BucketConfig) -> Self {
        let client = Client::new(&config);
        Self { config, client }
    }

    /// Object key with the configured base path
    fn object_key(&self, path: &str) -> String {
        let clean_path = path.trim_start_matches('/');
        if self.config.base_path.is_empty() {
            clean_path.to_string()
        } else {
            format!("{}/{}", self.config.base_path.trim_end_matches('/'), clean_path)
        }
    }
}

#[async_trait]
impl StorageProvider for BucketStorage {
    async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        let key = self.object_key(path);
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        self.client.put_object(&key, data, mime.as_ref()).await?;
        tracing::info!("Uploaded {} to bucket", key);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Bytes> {
        self.client.get_object(&self.object_key(path)).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let key = self.object_key(path);
        self.client.delete_object(&key).await?;
        tracing::debug!("Deleted {} from bucket", key);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        self.client.head_object(&self.object_key(path)).await
    }

    async fn get_download_url(&self, path: &str, expires: Duration) -> Result<Option<String>> {
        let secs = u32::try_from(expires.as_secs()).unwrap_or(u32::MAX);
        Ok(Some(self.client.presigned_url(&self.object_key(path), secs)))
    }

    fn storage_type(&self) -> &'static str {
        "bucket"
    }
}
