pub mod bucket;
pub mod local;
pub mod provider;

pub use bucket::BucketStorage;
pub use local::LocalStorage;
pub use provider::*;

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{AppError, Result};

/// Holds the provider selected by configuration
#[derive(Clone)]
pub struct StorageManager {
    provider: Arc<dyn StorageProvider>,
}

impl StorageManager {
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let provider: Arc<dyn StorageProvider> = match config.backend {
            StorageBackend::Local => Arc::new(LocalStorage::new(&config.local_path)),
            StorageBackend::Bucket => {
                let bucket = &config.bucket;
                if bucket.bucket.is_empty() || bucket.secret_id.is_empty() {
                    return Err(AppError::Internal(
                        "Bucket storage requires bucket name and credentials".to_string(),
                    ));
                }
                Arc::new(BucketStorage::new(bucket.clone()))
            }
        };
        tracing::info!("Using {} photo storage", provider.storage_type());
        Ok(Self { provider })
    }

    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &dyn StorageProvider {
        self.provider.as_ref()
    }
}
