//! Storage setup and initialization

use anyhow::{Context, Result};
use clipstash_core::Config;
use clipstash_storage::{create_storage, ObjectStorageGateway};

/// Build the configured backend behind a gateway. The bucket is created on first use.
pub async fn setup_storage(config: &Config) -> Result<ObjectStorageGateway> {
    tracing::info!("Initializing storage...");
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage backend")?;

    tracing::info!(
        backend = %storage.backend_type(),
        bucket = %storage.bucket(),
        "Storage initialized successfully"
    );

    Ok(ObjectStorageGateway::new(storage))
}
