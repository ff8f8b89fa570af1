pub mod health;
pub mod tasks;
pub mod video_get;
pub mod video_upload;
