use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::error::Result;

/// Storage provider trait
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Upload data to storage
    async fn put(&self, path: &str, data: Bytes) -> Result<()>;

    /// Download data from storage
    async fn get(&self, path: &str) -> Result<Bytes>;

    /// Delete data from storage; missing objects are not an error
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check if an object exists
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Signed URL for direct download (remote storage only)
    async fn get_download_url(&self, path: &str, expires: Duration) -> Result<Option<String>>;

    /// Get the storage type name
    fn storage_type(&self) -> &'static str;
}
