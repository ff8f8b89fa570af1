//! Shared application state handed to every handler.

use clipstash_ingest::UploadOrchestrator;
use sqlx::PgPool;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub uploads: UploadOrchestrator,
    /// `None` when the repository is not Postgres-backed; health then skips the database probe.
    pub db_pool: Option<PgPool>,
    pub upload: UploadConfig,
}

/// Settings for the multipart upload endpoint.
#[derive(Clone, Debug)]
pub struct UploadConfig {
    /// Directory file parts are spooled to before the transfer starts.
    pub spool_dir: PathBuf,
    pub max_file_size: u64,
    /// Presigned URL lifetime when the client does not ask for one.
    pub presigned_url_ttl: Duration,
}
