//! In-memory [`UploadRepository`] for tests.
//!
//! Mirrors the Postgres semantics: pairs are stored together, terminal rows are
//! never rewritten, and injected failures leave no partial state behind.

use async_trait::async_trait;
use chrono::Utc;
use clipstash_core::{AppError, UploadStatus, UploadTask, Video};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::upload::{check_pair, check_status_update, UploadRepository};

#[derive(Default)]
struct Tables {
    videos: HashMap<Uuid, Video>,
    tasks: HashMap<Uuid, UploadTask>,
}

#[derive(Clone, Default)]
pub struct InMemoryUploadRepository {
    tables: Arc<Mutex<Tables>>,
    fail_creates: Arc<AtomicBool>,
    fail_updates: Arc<AtomicBool>,
    update_calls: Arc<AtomicUsize>,
}

impl InMemoryUploadRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `create_pair` fail with a database error.
    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Make every `update_status_pair` fail with a database error.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Number of `update_status_pair` calls, including failed ones.
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn video_count(&self) -> usize {
        self.tables().videos.len()
    }

    pub fn task_count(&self) -> usize {
        self.tables().tasks.len()
    }

    /// Drop a video and its task, as a soft delete hides them from updates.
    pub fn remove_pair(&self, video_id: Uuid, task_id: Uuid) {
        let mut tables = self.tables();
        tables.videos.remove(&video_id);
        tables.tasks.remove(&task_id);
    }
}

#[async_trait]
impl UploadRepository for InMemoryUploadRepository {
    async fn create_pair(&self, video: &Video, task: &UploadTask) -> Result<(), AppError> {
        check_pair(video, task)?;
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut tables = self.tables();
        let duplicate = tables.videos.contains_key(&video.id)
            || tables.tasks.contains_key(&task.id)
            || tables
                .videos
                .values()
                .any(|v| v.storage_key == video.storage_key);
        if duplicate {
            return Err(AppError::Database(sqlx::Error::Protocol(
                "duplicate key value violates unique constraint".to_string(),
            )));
        }

        tables.videos.insert(video.id, video.clone());
        tables.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn update_status_pair(
        &self,
        video_id: Uuid,
        video_status: UploadStatus,
        task_id: Uuid,
        task_status: UploadStatus,
        error_msg: Option<&str>,
    ) -> Result<bool, AppError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        check_status_update(video_status, task_status)?;
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }

        let now = Utc::now();
        let mut tables = self.tables();
        let mut changed = false;

        if let Some(video) = tables.videos.get_mut(&video_id) {
            if !video.status.is_terminal() {
                video.status = video_status;
                video.updated_at = now;
                changed = true;
            }
        }

        if let Some(task) = tables.tasks.get_mut(&task_id) {
            if !task.status.is_terminal() {
                task.status = task_status;
                task.updated_at = now;
                if let Some(msg) = error_msg {
                    task.error_msg = Some(msg.to_string());
                }
                if task_status.is_terminal() {
                    task.completed_at = Some(now);
                }
                changed = true;
            }
        }

        Ok(changed)
    }

    async fn find_video(&self, video_id: Uuid) -> Result<Option<Video>, AppError> {
        Ok(self.tables().videos.get(&video_id).cloned())
    }

    async fn find_task(&self, task_id: Uuid) -> Result<Option<UploadTask>, AppError> {
        Ok(self.tables().tasks.get(&task_id).cloned())
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Video>, AppError> {
        let mut videos: Vec<Video> = self
            .tables()
            .videos
            .values()
            .filter(|v| v.owner_id == owner_id)
            .cloned()
            .collect();
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(videos)
    }

    async fn find_by_key(&self, storage_key: &str) -> Result<Option<Video>, AppError> {
        Ok(self
            .tables()
            .videos
            .values()
            .find(|v| v.storage_key == storage_key)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipstash_core::validation::{validate_upload, FileDescriptor, UploadVideoCommand};
    use clipstash_core::UploadPair;

    fn new_pair(owner: &str, key: &str) -> UploadPair {
        let validated = validate_upload(&UploadVideoCommand {
            user_id: Some(owner.to_string()),
            title: Some("t".to_string()),
            file: Some(FileDescriptor {
                filename: "a.mp4".to_string(),
                content_type: Some("video/mp4".to_string()),
                size: 10,
            }),
            ..Default::default()
        })
        .unwrap();
        UploadPair::build(&validated, key.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_terminal_update_is_idempotent() {
        let repo = InMemoryUploadRepository::new();
        let pair = new_pair("u1", "k1");
        repo.create_pair(&pair.video, &pair.task).await.unwrap();

        let first = repo
            .update_status_pair(
                pair.video_id(),
                UploadStatus::Completed,
                pair.task_id(),
                UploadStatus::Completed,
                None,
            )
            .await
            .unwrap();
        assert!(first);
        let after_first = repo.find_task(pair.task_id()).await.unwrap().unwrap();

        let second = repo
            .update_status_pair(
                pair.video_id(),
                UploadStatus::Completed,
                pair.task_id(),
                UploadStatus::Completed,
                None,
            )
            .await
            .unwrap();
        assert!(!second);
        let after_second = repo.find_task(pair.task_id()).await.unwrap().unwrap();
        assert_eq!(after_first, after_second);

        // A late failure cannot overwrite the completed state either
        let late = repo
            .update_status_pair(
                pair.video_id(),
                UploadStatus::Failed,
                pair.task_id(),
                UploadStatus::Failed,
                Some("late"),
            )
            .await
            .unwrap();
        assert!(!late);
        let video = repo.find_video(pair.video_id()).await.unwrap().unwrap();
        assert_eq!(video.status, UploadStatus::Completed);
    }

    #[tokio::test]
    async fn test_failed_create_leaves_nothing() {
        let repo = InMemoryUploadRepository::new();
        repo.fail_creates(true);
        let pair = new_pair("u1", "k1");

        let result = repo.create_pair(&pair.video, &pair.task).await;
        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(repo.video_count(), 0);
        assert_eq!(repo.task_count(), 0);
    }

    #[tokio::test]
    async fn test_find_by_owner_and_key() {
        let repo = InMemoryUploadRepository::new();
        let a = new_pair("u1", "k1");
        let b = new_pair("u2", "k2");
        repo.create_pair(&a.video, &a.task).await.unwrap();
        repo.create_pair(&b.video, &b.task).await.unwrap();

        let owned = repo.find_by_owner("u1").await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, a.video_id());

        let by_key = repo.find_by_key("k2").await.unwrap().unwrap();
        assert_eq!(by_key.id, b.video_id());
        assert!(repo.find_by_key("missing").await.unwrap().is_none());
    }
}
