//! Clipstash Ingest
//!
//! The upload pipeline: validate a command, persist the video and its upload
//! task, then stream the bytes to object storage on a detached task.

pub mod orchestrator;
pub mod source;

pub use orchestrator::{TransferOutcome, UploadHandle, UploadOrchestrator};
pub use source::{BytesSource, FileSource, UploadSource};
