//! Byte sources a transfer reads from.

use async_trait::async_trait;
use bytes::Bytes;
use clipstash_storage::ByteReader;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// Where the bytes of an upload come from.
///
/// `open` is called once, on the transfer task. The source itself is dropped
/// only after the outcome has been recorded, so it may own resources (such as
/// a spooled temp file) that must outlive the read.
#[async_trait]
pub trait UploadSource: Send + 'static {
    async fn open(&mut self) -> std::io::Result<ByteReader>;
}

/// A file on local disk.
pub struct FileSource {
    path: PathBuf,
    // Deletes the file when the source is dropped
    _temp: Option<TempPath>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _temp: None,
        }
    }

    /// A spooled temp file, removed once the transfer has finished.
    pub fn temporary(temp: TempPath) -> Self {
        Self {
            path: temp.to_path_buf(),
            _temp: Some(temp),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl UploadSource for FileSource {
    async fn open(&mut self) -> std::io::Result<ByteReader> {
        let file = tokio::fs::File::open(&self.path).await?;
        Ok(Box::pin(file))
    }
}

/// An in-memory buffer.
pub struct BytesSource {
    data: Bytes,
}

impl BytesSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl UploadSource for BytesSource {
    async fn open(&mut self) -> std::io::Result<ByteReader> {
        Ok(Box::pin(Cursor::new(self.data.clone())))
    }
}
