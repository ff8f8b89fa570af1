//! Test helpers: build AppState and router for HTTP tests.
//!
//! Uses the in-memory repository and tempdir-backed local storage, so no
//! external services are needed.

use axum_test::TestServer;
use clipstash_api::constants;
use clipstash_api::setup::routes;
use clipstash_api::state::{AppState, UploadConfig};
use clipstash_core::validation::MAX_VIDEO_SIZE_BYTES;
use clipstash_core::UploadStatus;
use clipstash_db::{InMemoryUploadRepository, UploadRepository};
use clipstash_ingest::UploadOrchestrator;
use clipstash_storage::{LocalStorage, ObjectStorageGateway};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

pub struct TestApp {
    pub server: TestServer,
    pub repo: InMemoryUploadRepository,
    pub storage: ObjectStorageGateway,
    pub spool_dir: TempDir,
    pub _storage_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Poll the repository until the task leaves `init`.
    pub async fn wait_for_task(&self, task_id: Uuid) -> UploadStatus {
        for _ in 0..200 {
            let task = self
                .repo
                .find_task(task_id)
                .await
                .expect("find_task failed")
                .expect("task row missing");
            if task.status.is_terminal() {
                return task.status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} did not reach a terminal status", task_id);
    }

    /// Number of files left in the spool directory.
    pub fn spooled_files(&self) -> usize {
        std::fs::read_dir(self.spool_dir.path())
            .expect("read spool dir")
            .count()
    }

    /// Spooled files are released right after the status update; give the
    /// transfer task a moment to get there.
    pub async fn wait_for_empty_spool(&self) -> usize {
        for _ in 0..200 {
            if self.spooled_files() == 0 {
                return 0;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.spooled_files()
    }
}

pub async fn setup_test_app() -> TestApp {
    let storage_dir = tempfile::tempdir().expect("Failed to create storage dir");
    let spool_dir = tempfile::tempdir().expect("Failed to create spool dir");

    let local = LocalStorage::new(
        storage_dir.path(),
        "http://localhost:3000/media".to_string(),
        "videos".to_string(),
    )
    .await
    .expect("Failed to create local storage");
    let storage = ObjectStorageGateway::new(Arc::new(local));

    let repo = InMemoryUploadRepository::new();
    let repository: Arc<dyn UploadRepository> = Arc::new(repo.clone());
    let uploads = UploadOrchestrator::new(repository, storage.clone(), 4);

    let state = Arc::new(AppState {
        uploads,
        db_pool: None,
        upload: UploadConfig {
            spool_dir: spool_dir.path().to_path_buf(),
            max_file_size: MAX_VIDEO_SIZE_BYTES,
            presigned_url_ttl: Duration::from_secs(3600),
        },
    });

    let app = routes::setup_routes(state);
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        repo,
        storage,
        spool_dir,
        _storage_dir: storage_dir,
    }
}
