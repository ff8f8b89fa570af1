pub mod status;
pub mod upload;
pub mod upload_task;
pub mod video;

pub use status::UploadStatus;
pub use upload::UploadPair;
pub use upload_task::{UploadTask, UploadTaskResponse};
pub use video::{Video, VideoResponse};
