//! Clipstash Storage Library
//!
//! Object storage for uploaded videos: the `Storage` trait with S3 and local
//! filesystem backends, the object key generator, and `ObjectStorageGateway`,
//! which bootstraps the bucket lazily before first use.
//!
//! # Object key format
//!
//! `videos/{owner_id}/{yyyy-mm-dd}/{uuid}{ext}`. The client filename only
//! contributes its extension. Keys must not contain `..` or a leading `/`.

pub mod factory;
pub mod gateway;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use clipstash_core::StorageBackend;
pub use factory::create_storage;
pub use gateway::{ObjectStorageGateway, DEFAULT_PRESIGN_TTL};
pub use keys::generate_object_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ByteReader, Storage, StorageError, StorageResult};
