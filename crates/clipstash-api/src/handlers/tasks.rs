use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use clipstash_core::models::UploadTaskResponse;
use clipstash_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Status of one upload task.
#[tracing::instrument(skip(state), fields(task_id = %id))]
pub async fn get_task(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<UploadTaskResponse>, HttpAppError> {
    let task = state
        .uploads
        .repository()
        .find_task(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Upload task {} not found", id)))?;

    Ok(Json(UploadTaskResponse::from(task)))
}
