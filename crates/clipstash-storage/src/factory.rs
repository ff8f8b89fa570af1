#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use clipstash_core::Config;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend() {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let region = config
                .s3_region()
                .or_else(|| config.aws_region())
                .map(String::from)
                .ok_or_else(|| {
                    StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
                })?;
            let endpoint = config.s3_endpoint().map(String::from);

            let storage = S3Storage::new(config.s3_bucket().to_string(), region, endpoint).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;
            let base_url = config.local_storage_base_url().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_BASE_URL not configured".to_string())
            })?;

            let storage = LocalStorage::new(
                base_path,
                base_url.to_string(),
                config.s3_bucket().to_string(),
            )
            .await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use clipstash_core::config::AppConfig;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_backend_from_config() {
        let dir = tempdir().unwrap();
        let config = Config(Box::new(AppConfig {
            server_port: 4000,
            environment: "test".to_string(),
            database_url: "postgres://localhost/clipstash".to_string(),
            db_max_connections: 5,
            db_timeout_seconds: 5,
            storage_backend: StorageBackend::Local,
            s3_bucket: "videos".to_string(),
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: Some(dir.path().to_string_lossy().into_owned()),
            local_storage_base_url: Some("http://localhost:4000/media".to_string()),
            upload_spool_dir: None,
            max_concurrent_uploads: 4,
            presigned_url_ttl_secs: 3600,
        }));

        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Local);
        assert_eq!(storage.bucket(), "videos");
    }
}
