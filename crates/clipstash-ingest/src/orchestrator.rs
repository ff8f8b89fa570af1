//! Upload orchestrator
//!
//! `submit` runs on the caller's task: validate, assign the object key, and
//! persist the video/task pair. Only after the pair is committed is the byte
//! transfer spawned. The transfer records exactly one terminal status for the
//! pair and is never tied to the caller's lifetime.

use chrono::{DateTime, Utc};
use clipstash_core::{validate_upload, AppError, UploadPair, UploadStatus, UploadVideoCommand};
use clipstash_db::UploadRepository;
use clipstash_storage::{generate_object_key, ObjectStorageGateway};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::source::UploadSource;

/// Final state of one transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOutcome {
    pub video_id: Uuid,
    pub task_id: Uuid,
    pub status: UploadStatus,
    /// Bytes written to storage, when the put succeeded.
    pub bytes_written: Option<u64>,
    pub error: Option<String>,
    /// Whether the terminal status reached the metadata store.
    pub recorded: bool,
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        self.status == UploadStatus::Completed
    }
}

/// Caller-side view of a spawned transfer.
///
/// Dropping the handle detaches the transfer; it keeps running.
#[derive(Debug)]
pub struct UploadHandle {
    video_id: Uuid,
    task_id: Uuid,
    storage_key: String,
    started_at: DateTime<Utc>,
    status: watch::Receiver<UploadStatus>,
    join: JoinHandle<TransferOutcome>,
}

impl UploadHandle {
    pub fn video_id(&self) -> Uuid {
        self.video_id
    }

    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// `in_progress` until the transfer has recorded its terminal status.
    ///
    /// If the status update never lands in the repository the value stays
    /// `in_progress` and the channel closes; [`TransferOutcome::recorded`]
    /// tells the two cases apart.
    pub fn status(&self) -> UploadStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadStatus> {
        self.status.clone()
    }

    /// Wait for the transfer to finish.
    pub async fn wait(self) -> Result<TransferOutcome, AppError> {
        self.join
            .await
            .map_err(|e| AppError::Internal(format!("Upload transfer task failed: {}", e)))
    }
}

/// Coordinates the synchronous persist phase and the detached transfer.
#[derive(Clone)]
pub struct UploadOrchestrator {
    repository: Arc<dyn UploadRepository>,
    storage: ObjectStorageGateway,
    permits: Arc<Semaphore>,
}

impl UploadOrchestrator {
    /// `max_concurrent` bounds transfers in flight; submissions beyond it are
    /// accepted and wait for a permit on their own task.
    pub fn new(
        repository: Arc<dyn UploadRepository>,
        storage: ObjectStorageGateway,
        max_concurrent: usize,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        tracing::info!(max_concurrent = max_concurrent, "Upload orchestrator initialized");

        Self {
            repository,
            storage,
            permits: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    pub fn repository(&self) -> &Arc<dyn UploadRepository> {
        &self.repository
    }

    pub fn storage(&self) -> &ObjectStorageGateway {
        &self.storage
    }

    /// Validate and persist an upload, then start its transfer.
    ///
    /// Any error is returned before anything is spawned. A validation error
    /// writes nothing; a persistence error leaves neither row behind.
    #[tracing::instrument(skip(self, cmd, source), fields(video.id = tracing::field::Empty, task.id = tracing::field::Empty))]
    pub async fn submit<S: UploadSource>(
        &self,
        cmd: &UploadVideoCommand,
        source: S,
    ) -> Result<UploadHandle, AppError> {
        let start = Instant::now();

        let upload = validate_upload(cmd).map_err(|e| {
            tracing::debug!(error = %e, "Upload rejected by validation");
            e
        })?;

        let storage_key = generate_object_key(upload.owner_id(), upload.filename());
        let pair = UploadPair::build(&upload, storage_key)?;

        let span = tracing::Span::current();
        span.record("video.id", tracing::field::display(pair.video_id()));
        span.record("task.id", tracing::field::display(pair.task_id()));

        if let Err(e) = self.repository.create_pair(&pair.video, &pair.task).await {
            tracing::error!(
                error = %e,
                owner_id = %pair.video.owner_id,
                "Failed to persist upload metadata"
            );
            return Err(e);
        }

        let started_at = Utc::now();
        let (status_tx, status_rx) = watch::channel(UploadStatus::InProgress);

        let transfer = Transfer {
            repository: self.repository.clone(),
            storage: self.storage.clone(),
            video_id: pair.video_id(),
            task_id: pair.task_id(),
            storage_key: pair.storage_key().to_string(),
            content_type: pair.video.content_type.clone(),
            size: upload.file_size(),
        };
        let permits = self.permits.clone();

        let join = tokio::spawn(async move {
            // The semaphore is never closed; a missing permit only lifts the bound
            let _permit = permits.acquire_owned().await.ok();
            transfer.run(source, status_tx).await
        });

        tracing::info!(
            video_id = %pair.video_id(),
            task_id = %pair.task_id(),
            storage_key = %pair.storage_key(),
            file_size = upload.file_size(),
            duration_ms = start.elapsed().as_millis(),
            "Upload accepted, transfer scheduled"
        );

        Ok(UploadHandle {
            video_id: pair.video_id(),
            task_id: pair.task_id(),
            storage_key: pair.video.storage_key,
            started_at,
            status: status_rx,
            join,
        })
    }
}

/// Everything the detached transfer needs, owned.
struct Transfer {
    repository: Arc<dyn UploadRepository>,
    storage: ObjectStorageGateway,
    video_id: Uuid,
    task_id: Uuid,
    storage_key: String,
    content_type: String,
    size: u64,
}

impl Transfer {
    async fn run<S: UploadSource>(
        self,
        mut source: S,
        status_tx: watch::Sender<UploadStatus>,
    ) -> TransferOutcome {
        let start = Instant::now();

        let result = match source.open().await {
            Ok(reader) => self
                .storage
                .put(&self.storage_key, reader, Some(self.size), &self.content_type)
                .await
                .map_err(|e| {
                    tracing::error!(
                        video_id = %self.video_id,
                        storage_key = %self.storage_key,
                        error = %e,
                        "Failed to write video to storage"
                    );
                    e.to_string()
                }),
            Err(e) => {
                tracing::error!(
                    video_id = %self.video_id,
                    error = %e,
                    "Failed to open upload source"
                );
                Err(format!("Failed to open upload source: {}", e))
            }
        };

        let (status, bytes_written, error) = match result {
            Ok(bytes) => (UploadStatus::Completed, Some(bytes), None),
            Err(msg) => (UploadStatus::Failed, None, Some(msg)),
        };

        let recorded = match self
            .repository
            .update_status_pair(self.video_id, status, self.task_id, status, error.as_deref())
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(
                    video_id = %self.video_id,
                    task_id = %self.task_id,
                    storage_key = %self.storage_key,
                    status = %status,
                    "Upload rows missing or already terminal, status not recorded"
                );
                false
            }
            Err(e) => {
                tracing::error!(
                    video_id = %self.video_id,
                    task_id = %self.task_id,
                    storage_key = %self.storage_key,
                    status = %status,
                    error = %e,
                    "Failed to record upload status, stored object may be orphaned"
                );
                false
            }
        };

        // Release the source (and any spooled file) before reporting the outcome
        drop(source);

        if status == UploadStatus::Completed {
            tracing::info!(
                video_id = %self.video_id,
                task_id = %self.task_id,
                bytes = bytes_written.unwrap_or_default(),
                duration_ms = start.elapsed().as_millis(),
                "Upload transfer completed"
            );
        } else {
            tracing::warn!(
                video_id = %self.video_id,
                task_id = %self.task_id,
                duration_ms = start.elapsed().as_millis(),
                "Upload transfer failed"
            );
        }

        // An unrecorded status is never published; the sender drops with the
        // handle still reading `in_progress`.
        if recorded {
            status_tx.send_replace(status);
        }

        TransferOutcome {
            video_id: self.video_id,
            task_id: self.task_id,
            status,
            bytes_written,
            error,
            recorded,
        }
    }
}
