use chrono::Utc;
use uuid::Uuid;

use super::status::UploadStatus;
use super::upload_task::UploadTask;
use super::video::Video;
use crate::error::AppError;
use crate::validation::ValidatedUpload;

/// A Video and the UploadTask that moves its bytes, built and persisted together.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPair {
    pub video: Video,
    pub task: UploadTask,
}

impl UploadPair {
    /// Build a fresh pair in `init` status sharing `storage_key`.
    ///
    /// Taking a [`ValidatedUpload`] means the command already passed validation.
    pub fn build(upload: &ValidatedUpload, storage_key: String) -> Result<Self, AppError> {
        if storage_key.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "storage key must not be empty".to_string(),
            ));
        }

        let file_size = i64::try_from(upload.file_size()).map_err(|_| {
            AppError::InvalidInput(format!("file size {} out of range", upload.file_size()))
        })?;

        let now = Utc::now();
        let video = Video {
            id: Uuid::new_v4(),
            owner_id: upload.owner_id().to_string(),
            title: upload.title().to_string(),
            description: upload.description().to_string(),
            filename: upload.filename().to_string(),
            file_size,
            format: upload.format().to_string(),
            content_type: upload.content_type().to_string(),
            storage_key: storage_key.clone(),
            status: UploadStatus::Init,
            created_at: now,
            updated_at: now,
        };
        let task = UploadTask {
            id: Uuid::new_v4(),
            owner_id: video.owner_id.clone(),
            video_id: video.id,
            storage_key,
            status: UploadStatus::Init,
            error_msg: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };

        Ok(UploadPair { video, task })
    }

    pub fn video_id(&self) -> Uuid {
        self.video.id
    }

    pub fn task_id(&self) -> Uuid {
        self.task.id
    }

    pub fn storage_key(&self) -> &str {
        &self.video.storage_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{validate_upload, FileDescriptor, UploadVideoCommand};

    fn validated() -> ValidatedUpload {
        validate_upload(&UploadVideoCommand {
            user_id: Some("u1".to_string()),
            title: Some("holiday".to_string()),
            description: Some("beach".to_string()),
            format: None,
            file: Some(FileDescriptor {
                filename: "holiday.mp4".to_string(),
                content_type: Some("video/mp4".to_string()),
                size: 1024,
            }),
        })
        .unwrap()
    }

    #[test]
    fn test_pair_shares_key_and_starts_init() {
        let key = "videos/u1/2024-01-01/abc.mp4".to_string();
        let pair = UploadPair::build(&validated(), key.clone()).unwrap();

        assert_eq!(pair.video.storage_key, key);
        assert_eq!(pair.task.storage_key, key);
        assert_eq!(pair.task.video_id, pair.video.id);
        assert_eq!(pair.task.owner_id, "u1");
        assert_eq!(pair.video.status, UploadStatus::Init);
        assert_eq!(pair.task.status, UploadStatus::Init);
        assert_eq!(pair.video.file_size, 1024);
        assert_ne!(pair.video_id(), pair.task_id());
    }

    #[test]
    fn test_fresh_ids_per_build() {
        let upload = validated();
        let a = UploadPair::build(&upload, "k1".to_string()).unwrap();
        let b = UploadPair::build(&upload, "k2".to_string()).unwrap();
        assert_ne!(a.video_id(), b.video_id());
        assert_ne!(a.task_id(), b.task_id());
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = UploadPair::build(&validated(), "  ".to_string());
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
