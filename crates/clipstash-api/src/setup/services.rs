//! Repositories, the upload orchestrator and the shared state.

use anyhow::{Context, Result};
use clipstash_core::Config;
use clipstash_db::{PgUploadRepository, UploadRepository};
use clipstash_ingest::UploadOrchestrator;
use clipstash_storage::ObjectStorageGateway;
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;

use crate::state::{AppState, UploadConfig};
use clipstash_core::validation::MAX_VIDEO_SIZE_BYTES;

pub async fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: ObjectStorageGateway,
) -> Result<Arc<AppState>> {
    let repository: Arc<dyn UploadRepository> = Arc::new(PgUploadRepository::new(pool.clone()));
    let uploads = UploadOrchestrator::new(repository, storage, config.max_concurrent_uploads());

    let spool_dir = config
        .upload_spool_dir()
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    tokio::fs::create_dir_all(&spool_dir)
        .await
        .with_context(|| format!("Failed to create spool directory {}", spool_dir.display()))?;

    tracing::info!(
        spool_dir = %spool_dir.display(),
        max_concurrent_uploads = config.max_concurrent_uploads(),
        "Upload services initialized"
    );

    Ok(Arc::new(AppState {
        uploads,
        db_pool: Some(pool),
        upload: UploadConfig {
            spool_dir,
            max_file_size: MAX_VIDEO_SIZE_BYTES,
            presigned_url_ttl: config.presigned_url_ttl(),
        },
    }))
}
