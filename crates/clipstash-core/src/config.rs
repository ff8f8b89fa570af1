//! Configuration module
//!
//! Settings are read from the process environment (optionally seeded from a
//! `.env` file) once at startup and handed to each component's constructor.

use std::env;
use std::time::Duration;

use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const SERVER_PORT: u16 = 4000;
const MAX_CONCURRENT_UPLOADS: usize = 16;
const PRESIGNED_URL_TTL_SECS: u64 = 3600;
const DEFAULT_BUCKET: &str = "videos";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: String,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // MinIO and other S3-compatible providers
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Upload pipeline
    pub upload_spool_dir: Option<String>,
    pub max_concurrent_uploads: usize,
    pub presigned_url_ttl_secs: u64,
}

#[derive(Clone, Debug)]
pub struct Config(pub Box<AppConfig>);

impl Config {
    fn inner(&self) -> &AppConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        AppConfig::from_env().map(|c| Config(Box::new(c)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn is_production(&self) -> bool {
        let env = self.inner().environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.inner().server_port
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().db_timeout_seconds
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn s3_bucket(&self) -> &str {
        &self.inner().s3_bucket
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.inner().aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.inner().local_storage_base_url.as_deref()
    }

    /// Directory multipart file parts are spooled to before the transfer starts.
    pub fn upload_spool_dir(&self) -> Option<&str> {
        self.inner().upload_spool_dir.as_deref()
    }

    pub fn max_concurrent_uploads(&self) -> usize {
        self.inner().max_concurrent_uploads
    }

    pub fn presigned_url_ttl(&self) -> Duration {
        Duration::from_secs(self.inner().presigned_url_ttl_secs)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::S3,
        };

        Ok(AppConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").unwrap_or_else(|_| DEFAULT_BUCKET.to_string()),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            upload_spool_dir: env::var("UPLOAD_SPOOL_DIR").ok(),
            max_concurrent_uploads: env::var("MAX_CONCURRENT_UPLOADS")
                .unwrap_or_else(|_| MAX_CONCURRENT_UPLOADS.to_string())
                .parse()
                .unwrap_or(MAX_CONCURRENT_UPLOADS),
            presigned_url_ttl_secs: env::var("PRESIGNED_URL_TTL_SECS")
                .unwrap_or_else(|_| PRESIGNED_URL_TTL_SECS.to_string())
                .parse()
                .unwrap_or(PRESIGNED_URL_TTL_SECS),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.database_url.trim().is_empty() {
            return Err(anyhow::anyhow!("DATABASE_URL must not be empty"));
        }

        if self.db_max_connections == 0 {
            return Err(anyhow::anyhow!("DB_MAX_CONNECTIONS must be greater than 0"));
        }

        if self.max_concurrent_uploads == 0 {
            return Err(anyhow::anyhow!(
                "MAX_CONCURRENT_UPLOADS must be greater than 0"
            ));
        }

        if self.presigned_url_ttl_secs == 0 || self.presigned_url_ttl_secs > 7 * 24 * 3600 {
            return Err(anyhow::anyhow!(
                "PRESIGNED_URL_TTL_SECS must be between 1 second and 7 days"
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.trim().is_empty() {
                    return Err(anyhow::anyhow!("S3_BUCKET must not be empty"));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when STORAGE_BACKEND=s3"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when STORAGE_BACKEND=local"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when STORAGE_BACKEND=local"
                    ));
                }
            }
        }

        Ok(())
    }
}
