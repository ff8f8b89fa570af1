//! Clipstash Database Layer
//!
//! Metadata persistence for videos and their upload tasks.

pub mod db;

pub use db::upload::{PgUploadRepository, UploadRepository};
pub use db::{connect, run_migrations};

#[cfg(any(test, feature = "test-helpers"))]
pub use db::memory::InMemoryUploadRepository;
