use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::UploadStatus;

/// One attempt to move a video's bytes into object storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadTask {
    pub id: Uuid,
    pub owner_id: String,
    pub video_id: Uuid,
    /// Always equal to the referenced video's storage key.
    pub storage_key: String,
    pub status: UploadStatus,
    pub error_msg: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadTaskResponse {
    pub id: Uuid,
    pub video_id: Uuid,
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UploadTask> for UploadTaskResponse {
    fn from(task: UploadTask) -> Self {
        UploadTaskResponse {
            id: task.id,
            video_id: task.video_id,
            status: task.status,
            error_msg: task.error_msg,
            completed_at: task.completed_at,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}
