//! Clipstash API Library
//!
//! HTTP handlers for video uploads and status queries, plus application setup.

pub mod constants;
pub mod error;
mod handlers;
pub mod setup;
pub mod state;
mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use handlers::health::HealthCheckResponse;
pub use handlers::video_get::VideoUrlResponse;
pub use handlers::video_upload::UploadVideoResponse;
