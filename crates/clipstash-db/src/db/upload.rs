//! Video and upload task metadata.
//!
//! Both rows of a pair are written in one transaction, on create and on every
//! status change. Status updates never touch a row that is already terminal.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clipstash_core::{AppError, UploadStatus, UploadTask, Video};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Persistence contract for the upload pipeline.
#[async_trait]
pub trait UploadRepository: Send + Sync {
    /// Insert a video and its upload task atomically. On error neither row exists.
    async fn create_pair(&self, video: &Video, task: &UploadTask) -> Result<(), AppError>;

    /// Move both rows to new statuses atomically.
    ///
    /// Rows already in a terminal status are left untouched. Returns whether
    /// any row changed.
    async fn update_status_pair(
        &self,
        video_id: Uuid,
        video_status: UploadStatus,
        task_id: Uuid,
        task_status: UploadStatus,
        error_msg: Option<&str>,
    ) -> Result<bool, AppError>;

    async fn find_video(&self, video_id: Uuid) -> Result<Option<Video>, AppError>;

    async fn find_task(&self, task_id: Uuid) -> Result<Option<UploadTask>, AppError>;

    /// Videos of one owner, newest first.
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Video>, AppError>;

    async fn find_by_key(&self, storage_key: &str) -> Result<Option<Video>, AppError>;
}

/// Checks shared by every repository implementation before a pair is written.
pub fn check_pair(video: &Video, task: &UploadTask) -> Result<(), AppError> {
    if task.video_id != video.id {
        return Err(AppError::InvalidInput(format!(
            "task {} references video {}, expected {}",
            task.id, task.video_id, video.id
        )));
    }
    if task.storage_key != video.storage_key {
        return Err(AppError::InvalidInput(
            "task storage key differs from video storage key".to_string(),
        ));
    }
    if task.owner_id != video.owner_id {
        return Err(AppError::InvalidInput(
            "task owner differs from video owner".to_string(),
        ));
    }
    if video.status != UploadStatus::Init || task.status != UploadStatus::Init {
        return Err(AppError::InvalidInput(
            "new uploads must start in init status".to_string(),
        ));
    }
    Ok(())
}

/// Status updates may only move a pair forward out of `init`.
pub fn check_status_update(
    video_status: UploadStatus,
    task_status: UploadStatus,
) -> Result<(), AppError> {
    for status in [video_status, task_status] {
        if !UploadStatus::Init.can_transition_to(status) {
            return Err(AppError::InvalidInput(format!(
                "cannot update status to {}",
                status
            )));
        }
    }
    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
struct VideoRow {
    uuid: Uuid,
    user_uuid: String,
    title: String,
    description: String,
    filename: String,
    file_size: i64,
    format: String,
    content_type: String,
    storage_path: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VideoRow> for Video {
    type Error = AppError;

    fn try_from(row: VideoRow) -> Result<Self, Self::Error> {
        Ok(Video {
            id: row.uuid,
            owner_id: row.user_uuid,
            title: row.title,
            description: row.description,
            filename: row.filename,
            file_size: row.file_size,
            format: row.format,
            content_type: row.content_type,
            storage_key: row.storage_path,
            status: parse_status(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UploadTaskRow {
    uuid: Uuid,
    user_uuid: String,
    video_uuid: Uuid,
    storage_path: String,
    status: String,
    error_msg: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UploadTaskRow> for UploadTask {
    type Error = AppError;

    fn try_from(row: UploadTaskRow) -> Result<Self, Self::Error> {
        Ok(UploadTask {
            id: row.uuid,
            owner_id: row.user_uuid,
            video_id: row.video_uuid,
            storage_key: row.storage_path,
            status: parse_status(&row.status)?,
            error_msg: row.error_msg,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_status(value: &str) -> Result<UploadStatus, AppError> {
    value
        .parse()
        .map_err(|e: anyhow::Error| AppError::Internal(format!("Corrupt status column: {}", e)))
}

const VIDEO_COLUMNS: &str = r#"
    uuid, user_uuid, title, description, filename, file_size, format,
    content_type, storage_path, status, created_at, updated_at
"#;

/// Postgres-backed [`UploadRepository`].
#[derive(Clone)]
pub struct PgUploadRepository {
    pool: PgPool,
}

impl PgUploadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_video_tx(
        tx: &mut Transaction<'_, Postgres>,
        video: &Video,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO video (
                uuid, user_uuid, title, description, filename, file_size, format,
                content_type, storage_path, status, created_at, updated_at, is_deleted
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, FALSE)
            "#,
        )
        .bind(video.id)
        .bind(&video.owner_id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.filename)
        .bind(video.file_size)
        .bind(&video.format)
        .bind(&video.content_type)
        .bind(&video.storage_key)
        .bind(video.status.as_str())
        .bind(video.created_at)
        .bind(video.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn insert_task_tx(
        tx: &mut Transaction<'_, Postgres>,
        task: &UploadTask,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO video_upload_task (
                uuid, user_uuid, video_uuid, status, error_msg, completed_at,
                storage_path, created_at, updated_at, is_deleted
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE)
            "#,
        )
        .bind(task.id)
        .bind(&task.owner_id)
        .bind(task.video_id)
        .bind(task.status.as_str())
        .bind(&task.error_msg)
        .bind(task.completed_at)
        .bind(&task.storage_key)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl UploadRepository for PgUploadRepository {
    #[tracing::instrument(skip(self, video, task), fields(db.table = "video,video_upload_task", db.operation = "insert", video_id = %video.id, task_id = %task.id))]
    async fn create_pair(&self, video: &Video, task: &UploadTask) -> Result<(), AppError> {
        check_pair(video, task)?;

        // Dropping the transaction on an early return rolls it back
        let mut tx = self.pool.begin().await?;
        Self::insert_video_tx(&mut tx, video).await?;
        Self::insert_task_tx(&mut tx, task).await?;
        tx.commit().await?;

        tracing::debug!(storage_key = %video.storage_key, "Upload pair created");
        Ok(())
    }

    #[tracing::instrument(skip(self, error_msg), fields(db.table = "video,video_upload_task", db.operation = "update"))]
    async fn update_status_pair(
        &self,
        video_id: Uuid,
        video_status: UploadStatus,
        task_id: Uuid,
        task_status: UploadStatus,
        error_msg: Option<&str>,
    ) -> Result<bool, AppError> {
        check_status_update(video_status, task_status)?;

        let now = Utc::now();
        let completed_at = task_status.is_terminal().then_some(now);
        let [completed, failed] = UploadStatus::terminal_values();

        let mut tx = self.pool.begin().await?;

        let video_rows = sqlx::query(
            r#"
            UPDATE video
            SET status = $2, updated_at = $3
            WHERE uuid = $1 AND is_deleted = FALSE AND status NOT IN ($4, $5)
            "#,
        )
        .bind(video_id)
        .bind(video_status.as_str())
        .bind(now)
        .bind(completed)
        .bind(failed)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let task_rows = sqlx::query(
            r#"
            UPDATE video_upload_task
            SET status = $2,
                error_msg = COALESCE($3, error_msg),
                completed_at = COALESCE($4, completed_at),
                updated_at = $5
            WHERE uuid = $1 AND is_deleted = FALSE AND status NOT IN ($6, $7)
            "#,
        )
        .bind(task_id)
        .bind(task_status.as_str())
        .bind(error_msg)
        .bind(completed_at)
        .bind(now)
        .bind(completed)
        .bind(failed)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        let changed = video_rows + task_rows > 0;
        if !changed {
            tracing::debug!(
                video_id = %video_id,
                task_id = %task_id,
                "Status update skipped, rows already terminal or missing"
            );
        }
        Ok(changed)
    }

    #[tracing::instrument(skip(self), fields(db.table = "video", db.operation = "select", db.record_id = %video_id))]
    async fn find_video(&self, video_id: Uuid) -> Result<Option<Video>, AppError> {
        let row = sqlx::query_as::<_, VideoRow>(&format!(
            "SELECT {} FROM video WHERE uuid = $1 AND is_deleted = FALSE",
            VIDEO_COLUMNS
        ))
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Video::try_from).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "video_upload_task", db.operation = "select", db.record_id = %task_id))]
    async fn find_task(&self, task_id: Uuid) -> Result<Option<UploadTask>, AppError> {
        let row = sqlx::query_as::<_, UploadTaskRow>(
            r#"
            SELECT uuid, user_uuid, video_uuid, storage_path, status, error_msg,
                   completed_at, created_at, updated_at
            FROM video_upload_task
            WHERE uuid = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UploadTask::try_from).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "video", db.operation = "select"))]
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Video>, AppError> {
        let rows = sqlx::query_as::<_, VideoRow>(&format!(
            "SELECT {} FROM video WHERE user_uuid = $1 AND is_deleted = FALSE ORDER BY created_at DESC, id DESC",
            VIDEO_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Video::try_from).collect()
    }

    #[tracing::instrument(skip(self), fields(db.table = "video", db.operation = "select"))]
    async fn find_by_key(&self, storage_key: &str) -> Result<Option<Video>, AppError> {
        let row = sqlx::query_as::<_, VideoRow>(&format!(
            "SELECT {} FROM video WHERE storage_path = $1 AND is_deleted = FALSE",
            VIDEO_COLUMNS
        ))
        .bind(storage_key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Video::try_from).transpose()
    }
}
