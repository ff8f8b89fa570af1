use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use clipstash_core::models::VideoResponse;
use clipstash_core::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const MAX_URL_TTL_SECS: u64 = 7 * 24 * 3600;

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VideoUrlResponse {
    pub video_id: Uuid,
    pub url: String,
    pub expires_in_secs: u64,
}

#[tracing::instrument(skip(state), fields(video_id = %id, operation = "get_video"))]
pub async fn get_video(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<VideoResponse>, HttpAppError> {
    let video = state
        .uploads
        .repository()
        .find_video(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", id)))?;

    Ok(Json(VideoResponse::from(video)))
}

#[tracing::instrument(skip(state), fields(operation = "list_videos"))]
pub async fn list_videos(
    Query(query): Query<OwnerQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let owner = query
        .user_id
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::MissingParameter("user_id".to_string()))?;

    let videos: Vec<VideoResponse> = state
        .uploads
        .repository()
        .find_by_owner(&owner)
        .await?
        .into_iter()
        .map(VideoResponse::from)
        .collect();

    Ok(Json(serde_json::json!({
        "videos": videos,
        "count": videos.len()
    })))
}

/// Presigned download URL for a video whose upload completed.
#[tracing::instrument(skip(state), fields(video_id = %id, operation = "get_video_url"))]
pub async fn get_video_url(
    Path(id): Path<Uuid>,
    Query(query): Query<UrlQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<VideoUrlResponse>, HttpAppError> {
    let ttl = match query.ttl_secs {
        Some(secs) if secs == 0 || secs > MAX_URL_TTL_SECS => {
            return Err(AppError::InvalidParameter(format!(
                "ttl_secs must be between 1 and {}",
                MAX_URL_TTL_SECS
            ))
            .into());
        }
        Some(secs) => Duration::from_secs(secs),
        None => state.upload.presigned_url_ttl,
    };

    let video = state
        .uploads
        .repository()
        .find_video(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", id)))?;

    if !video.is_available() {
        return Err(AppError::InvalidInput(format!(
            "Video {} is not available (status: {})",
            id, video.status
        ))
        .into());
    }

    let url = state
        .uploads
        .storage()
        .presigned_url(&video.storage_key, Some(ttl))
        .await?;

    Ok(Json(VideoUrlResponse {
        video_id: id,
        url,
        expires_in_secs: ttl.as_secs(),
    }))
}
