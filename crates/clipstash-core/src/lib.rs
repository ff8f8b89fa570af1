//! Clipstash Core Library
//!
//! Domain models, the upload command validator, error types and configuration
//! shared by every clipstash component.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{UploadPair, UploadStatus, UploadTask, Video};
pub use storage_types::StorageBackend;
pub use validation::{validate_upload, FileDescriptor, UploadVideoCommand, ValidatedUpload};
