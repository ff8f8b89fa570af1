//! Storage abstraction trait
//!
//! Every backend is bound to a single bucket chosen at construction time.

use crate::StorageBackend;
use async_trait::async_trait;
use clipstash_core::AppError;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Bucket already exists: {0}")]
    BucketAlreadyExists(String),

    #[error("Presign failed: {0}")]
    PresignFailed(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Owned async byte source handed to [`Storage::put_stream`].
pub type ByteReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Object not found: {}", key)),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Storage abstraction trait
///
/// Implementations must be safe to share across tasks; the orchestrator calls
/// them concurrently from many in-flight transfers.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Name of the bucket (or root directory) this backend writes to.
    fn bucket(&self) -> &str;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    async fn bucket_exists(&self) -> StorageResult<bool>;

    /// Create the bucket. Returns `BucketAlreadyExists` if another caller won the race.
    async fn create_bucket(&self) -> StorageResult<()>;

    /// Upload the full contents of `reader` under `storage_key`.
    ///
    /// The reader is consumed until EOF. `content_length` is a hint. Returns the
    /// number of bytes written.
    async fn put_stream(
        &self,
        storage_key: &str,
        content_type: &str,
        content_length: Option<u64>,
        reader: ByteReader,
    ) -> StorageResult<u64>;

    /// Read a whole object into memory.
    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete an object. Deleting a missing key succeeds.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Generate a presigned/temporary GET URL for direct access.
    async fn presigned_url(&self, storage_key: &str, expires_in: Duration)
        -> StorageResult<String>;
}
