use crate::error::{multipart_error, HttpAppError};
use crate::state::AppState;
use axum::extract::multipart::Field;
use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use clipstash_core::{AppError, FileDescriptor, UploadVideoCommand};
use clipstash_ingest::{BytesSource, FileSource};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadVideoResponse {
    pub video_id: Uuid,
    pub task_id: Uuid,
}

/// A file part written to the spool directory.
struct SpooledFile {
    path: TempPath,
    filename: String,
    content_type: Option<String>,
    size: u64,
}

/// Accept a multipart upload and schedule its transfer.
///
/// Responds as soon as the metadata is persisted; the transfer outcome is
/// observable through the task status endpoint.
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_video"))]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadVideoResponse>, HttpAppError> {
    let max = state.upload.max_file_size;
    let mut cmd = UploadVideoCommand::default();
    let mut spooled: Option<SpooledFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                if spooled.is_some() {
                    return Err(AppError::InvalidParameter(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    )
                    .into());
                }
                spooled = Some(spool_file(field, &state.upload.spool_dir, max).await?);
            }
            "user_id" => cmd.user_id = Some(read_text(field, max).await?),
            "title" => cmd.title = Some(read_text(field, max).await?),
            "description" => cmd.description = Some(read_text(field, max).await?),
            "format" => cmd.format = Some(read_text(field, max).await?),
            other => {
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    let handle = match spooled {
        Some(file) => {
            cmd.file = Some(FileDescriptor {
                filename: file.filename,
                content_type: file.content_type,
                size: file.size,
            });
            state
                .uploads
                .submit(&cmd, FileSource::temporary(file.path))
                .await?
        }
        // Validation reports the missing file
        None => {
            state
                .uploads
                .submit(&cmd, BytesSource::new(Bytes::new()))
                .await?
        }
    };

    Ok(Json(UploadVideoResponse {
        video_id: handle.video_id(),
        task_id: handle.task_id(),
    }))
}

async fn read_text(field: Field<'_>, max: u64) -> Result<String, AppError> {
    field.text().await.map_err(|e| multipart_error(e, max))
}

/// Stream a file part to a temp file. Stops as soon as `max` is exceeded.
async fn spool_file(mut field: Field<'_>, dir: &Path, max: u64) -> Result<SpooledFile, AppError> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(String::from);

    let temp = tempfile::Builder::new()
        .prefix("upload-")
        .tempfile_in(dir)
        .map_err(|e| AppError::Internal(format!("Failed to create spool file: {}", e)))?;
    let (std_file, path) = temp.into_parts();
    let mut file = tokio::fs::File::from_std(std_file);

    let mut size: u64 = 0;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, max))?
    {
        size += chunk.len() as u64;
        if size > max {
            return Err(AppError::PayloadTooLarge { size, max });
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    tracing::debug!(
        filename = %filename,
        size_bytes = size,
        path = %path.display(),
        "File part spooled"
    );

    Ok(SpooledFile {
        path,
        filename,
        content_type,
        size,
    })
}
