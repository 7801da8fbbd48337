use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::StorageProvider;

/// Local file system storage provider
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Resolve a key under the base directory, refusing anything that escapes it
    fn get_full_path(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes || relative.as_os_str().is_empty() {
            return Err(AppError::BadRequest(format!("Invalid storage path: {}", path)));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        let full_path = self.get_full_path(path)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        tracing::debug!("Saved file to {:?}", full_path);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Bytes> {
        let full_path = self.get_full_path(path)?;

        let data = fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound("File not found".to_string())
            } else {
                AppError::Storage(format!("Failed to read file {}: {}", path, e))
            }
        })?;

        Ok(Bytes::from(data))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.get_full_path(path)?;

        match fs::remove_file(&full_path).await {
            Ok(()) => {
                tracing::debug!("Deleted file {:?}", full_path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full_path = self.get_full_path(path)?;
        Ok(fs::try_exists(&full_path).await?)
    }

    async fn get_download_url(&self, _path: &str, _expires: Duration) -> Result<Option<String>> {
        // Served by the application itself
        Ok(None)
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.put("a.jpg", Bytes::from_static(b"jpeg")).await.unwrap();
        assert!(storage.exists("a.jpg").await.unwrap());
        assert_eq!(storage.get("a.jpg").await.unwrap(), Bytes::from_static(b"jpeg"));

        storage.delete("a.jpg").await.unwrap();
        assert!(!storage.exists("a.jpg").await.unwrap());
        // Deleting twice is fine
        storage.delete("a.jpg").await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let err = storage.get("missing.png").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("uploads"));
        let err = storage.get("../secret").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(storage.put("", Bytes::new()).await.is_err());
    }
}
