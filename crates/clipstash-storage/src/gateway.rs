//! Object storage gateway used by the upload pipeline.

use crate::traits::{ByteReader, Storage, StorageError, StorageResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Presigned URL lifetime when the caller does not choose one.
pub const DEFAULT_PRESIGN_TTL: Duration = Duration::from_secs(3600);

/// Bucket-scoped facade over a [`Storage`] backend.
///
/// Every operation makes sure the bucket exists before touching it. The check
/// runs once per gateway (shared across clones); a failed bootstrap is not
/// remembered, so the next call tries again.
#[derive(Clone)]
pub struct ObjectStorageGateway {
    storage: Arc<dyn Storage>,
    bucket_ready: Arc<OnceCell<()>>,
}

impl ObjectStorageGateway {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            bucket_ready: Arc::new(OnceCell::new()),
        }
    }

    pub fn bucket(&self) -> &str {
        self.storage.bucket()
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Create the bucket if it does not exist.
    ///
    /// Idempotent. Losing a concurrent create race counts as success.
    pub async fn ensure_bucket(&self) -> StorageResult<()> {
        if self.storage.bucket_exists().await? {
            return Ok(());
        }

        match self.storage.create_bucket().await {
            Ok(()) => Ok(()),
            Err(StorageError::BucketAlreadyExists(bucket)) => {
                tracing::debug!(bucket = %bucket, "Bucket created concurrently");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.storage.bucket(),
                    "Failed to create bucket"
                );
                Err(e)
            }
        }
    }

    async fn ready(&self) -> StorageResult<()> {
        self.bucket_ready
            .get_or_try_init(|| self.ensure_bucket())
            .await
            .map(|_| ())
    }

    /// Stream `reader` to `key`. No retry on failure.
    pub async fn put(
        &self,
        key: &str,
        reader: ByteReader,
        size: Option<u64>,
        content_type: &str,
    ) -> StorageResult<u64> {
        self.ready().await?;
        self.storage
            .put_stream(key, content_type, size, reader)
            .await
    }

    /// Read a whole object into memory. Missing keys yield `StorageError::NotFound`.
    pub async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.ready().await?;
        self.storage.get(key).await
    }

    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        self.ready().await?;
        self.storage.delete(key).await
    }

    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.ready().await?;
        self.storage.exists(key).await
    }

    /// Presigned GET URL, valid for `ttl` or [`DEFAULT_PRESIGN_TTL`].
    pub async fn presigned_url(&self, key: &str, ttl: Option<Duration>) -> StorageResult<String> {
        self.ready().await?;
        self.storage
            .presigned_url(key, ttl.unwrap_or(DEFAULT_PRESIGN_TTL))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageBackend;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory backend that counts bucket calls and can simulate a lost create race.
    #[derive(Default)]
    struct CountingStorage {
        exists: AtomicBool,
        exists_calls: AtomicUsize,
        create_calls: AtomicUsize,
        lose_race: bool,
        fail_create: AtomicBool,
    }

    #[async_trait]
    impl Storage for CountingStorage {
        fn bucket(&self) -> &str {
            "videos"
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Local
        }

        async fn bucket_exists(&self) -> StorageResult<bool> {
            self.exists_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.exists.load(Ordering::SeqCst))
        }

        async fn create_bucket(&self) -> StorageResult<()> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(StorageError::BackendError("access denied".to_string()));
            }
            self.exists.store(true, Ordering::SeqCst);
            if self.lose_race {
                return Err(StorageError::BucketAlreadyExists("videos".to_string()));
            }
            Ok(())
        }

        async fn put_stream(
            &self,
            _storage_key: &str,
            _content_type: &str,
            _content_length: Option<u64>,
            mut reader: ByteReader,
        ) -> StorageResult<u64> {
            let mut sink = Vec::new();
            let n = tokio::io::copy(&mut reader, &mut sink).await?;
            Ok(n)
        }

        async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
            Err(StorageError::NotFound(storage_key.to_string()))
        }

        async fn delete(&self, _storage_key: &str) -> StorageResult<()> {
            Ok(())
        }

        async fn exists(&self, _storage_key: &str) -> StorageResult<bool> {
            Ok(false)
        }

        async fn presigned_url(
            &self,
            storage_key: &str,
            expires_in: Duration,
        ) -> StorageResult<String> {
            Ok(format!("memory://{}?ttl={}", storage_key, expires_in.as_secs()))
        }
    }

    #[tokio::test]
    async fn test_bucket_bootstrapped_once() {
        let storage = Arc::new(CountingStorage::default());
        let gateway = ObjectStorageGateway::new(storage.clone());

        let data: ByteReader = Box::pin(std::io::Cursor::new(b"abc".to_vec()));
        assert_eq!(gateway.put("k", data, Some(3), "video/mp4").await.unwrap(), 3);
        assert!(!gateway.exists("k").await.unwrap());
        gateway.delete("k").await.unwrap();

        assert_eq!(storage.exists_calls.load(Ordering::SeqCst), 1);
        assert_eq!(storage.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_bootstraps_once() {
        let storage = Arc::new(CountingStorage::default());
        let gateway = ObjectStorageGateway::new(storage.clone());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gateway = gateway.clone();
                tokio::spawn(async move { gateway.presigned_url("k", None).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "memory://k?ttl=3600");
        }

        assert_eq!(storage.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lost_create_race_is_success() {
        let storage = Arc::new(CountingStorage {
            lose_race: true,
            ..Default::default()
        });
        let gateway = ObjectStorageGateway::new(storage);

        gateway.ensure_bucket().await.unwrap();
        gateway.ensure_bucket().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_bootstrap_is_retried() {
        let storage = Arc::new(CountingStorage::default());
        storage.fail_create.store(true, Ordering::SeqCst);
        let gateway = ObjectStorageGateway::new(storage.clone());

        let result = gateway.get("k").await;
        assert!(matches!(result, Err(StorageError::BackendError(_))));

        storage.fail_create.store(false, Ordering::SeqCst);
        let result = gateway.get("k").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert_eq!(storage.create_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_explicit_ttl_is_passed_through() {
        let gateway = ObjectStorageGateway::new(Arc::new(CountingStorage::default()));
        let url = gateway
            .presigned_url("k", Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(url, "memory://k?ttl=60");
    }
}
