use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub database: String,
    pub storage: String,
}

/// Liveness plus a probe of each backing service.
///
/// Storage problems degrade the report but do not fail it.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(5);

    let mut response = HealthCheckResponse {
        status: "healthy".to_string(),
        database: "not_configured".to_string(),
        storage: "unknown".to_string(),
    };
    let mut overall_healthy = true;

    if let Some(pool) = &state.db_pool {
        match tokio::time::timeout(TIMEOUT, sqlx::query("SELECT 1").execute(pool)).await {
            Ok(Ok(_)) => {
                response.database = "healthy".to_string();
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Database health check failed");
                response.database = format!("unhealthy: {}", e);
                overall_healthy = false;
            }
            Err(_) => {
                tracing::error!("Database health check timed out");
                response.database = "timeout".to_string();
                overall_healthy = false;
            }
        }
    }

    // Probe the backend directly so a health check never creates the bucket
    match tokio::time::timeout(TIMEOUT, state.uploads.storage().storage().bucket_exists()).await {
        Ok(Ok(true)) => {
            response.storage = "healthy".to_string();
        }
        Ok(Ok(false)) => {
            response.storage = "bucket_missing".to_string();
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Storage health check warning");
            response.storage = format!("degraded: {}", e);
        }
        Err(_) => {
            tracing::warn!("Storage health check timed out");
            response.storage = "timeout".to_string();
        }
    }

    let status_code = if overall_healthy {
        StatusCode::OK
    } else {
        response.status = "unhealthy".to_string();
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
