use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::UploadStatus;

/// One uploaded media asset.
///
/// `storage_key` is fixed when the aggregate is built and is never part of a
/// status update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub filename: String,
    pub file_size: i64,
    pub format: String,
    pub content_type: String,
    pub storage_key: String,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    pub fn is_available(&self) -> bool {
        self.status == UploadStatus::Completed
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VideoResponse {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub filename: String,
    pub file_size: i64,
    pub format: String,
    pub content_type: String,
    pub storage_key: String,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        VideoResponse {
            id: video.id,
            owner_id: video.owner_id,
            title: video.title,
            description: video.description,
            filename: video.filename,
            file_size: video.file_size,
            format: video.format,
            content_type: video.content_type,
            storage_key: video.storage_key,
            status: video.status,
            created_at: video.created_at,
            updated_at: video.updated_at,
        }
    }
}
