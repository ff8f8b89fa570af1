//! Upload command validation
//!
//! `validate_upload` is the only way to obtain a [`ValidatedUpload`], so every
//! aggregate built from one has passed the shape and policy checks below.

use std::path::Path;

use crate::error::AppError;

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MAX_VIDEO_SIZE_BYTES: u64 = 100 * 1024 * 1024;
pub const MAX_OWNER_ID_CHARS: usize = 64;

pub const ALLOWED_VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "wmv", "flv", "webm", "mkv"];

/// Video MIME types paired with the extension they correspond to.
const ALLOWED_VIDEO_CONTENT_TYPES: &[(&str, &str)] = &[
    ("video/mp4", "mp4"),
    ("video/x-msvideo", "avi"),
    ("video/avi", "avi"),
    ("video/msvideo", "avi"),
    ("video/quicktime", "mov"),
    ("video/x-ms-wmv", "wmv"),
    ("video/x-flv", "flv"),
    ("video/webm", "webm"),
    ("video/x-matroska", "mkv"),
];

/// Client-supplied description of the file part of an upload.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub filename: String,
    pub content_type: Option<String>,
    pub size: u64,
}

/// Raw upload request as bound from the transport layer.
#[derive(Debug, Clone, Default)]
pub struct UploadVideoCommand {
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Advisory; falls back to the file extension when absent.
    pub format: Option<String>,
    pub file: Option<FileDescriptor>,
}

/// An upload command that passed [`validate_upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpload {
    owner_id: String,
    title: String,
    description: String,
    filename: String,
    content_type: String,
    format: String,
    file_size: u64,
}

impl ValidatedUpload {
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Resolved video MIME type, taken from the declared type or the extension.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Strip MIME parameters (`; codecs=...`) and lowercase.
fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    ALLOWED_VIDEO_CONTENT_TYPES
        .iter()
        .find(|(_, ext)| *ext == extension)
        .map(|(ct, _)| *ct)
}

/// Owner ids become a storage key segment, so only key-safe characters pass.
fn is_key_safe(owner_id: &str) -> bool {
    owner_id.chars().count() <= MAX_OWNER_ID_CHARS
        && owner_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Resolve the MIME type to record for the upload, or `None` if neither the
/// declared content type nor the filename extension is an accepted video format.
fn resolve_video_format(file: &FileDescriptor) -> Option<(String, String)> {
    let extension = file_extension(&file.filename);

    if let Some(declared) = file.content_type.as_deref().map(normalize_content_type) {
        if let Some((ct, ext)) = ALLOWED_VIDEO_CONTENT_TYPES
            .iter()
            .find(|(ct, _)| *ct == declared)
        {
            let format = extension
                .clone()
                .filter(|e| ALLOWED_VIDEO_EXTENSIONS.contains(&e.as_str()))
                .unwrap_or_else(|| ext.to_string());
            return Some((ct.to_string(), format));
        }
    }

    let extension = extension?;
    if !ALLOWED_VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        return None;
    }
    let content_type = content_type_for_extension(&extension)?;
    Some((content_type.to_string(), extension))
}

/// Check an upload command's shape and policy limits.
///
/// Pure: no I/O and no side effects. Checks run in a fixed order so the first
/// failing rule determines the error.
pub fn validate_upload(cmd: &UploadVideoCommand) -> Result<ValidatedUpload, AppError> {
    let owner_id = present(cmd.user_id.as_deref())
        .ok_or_else(|| AppError::MissingParameter("user_id".to_string()))?;
    let title = present(cmd.title.as_deref())
        .ok_or_else(|| AppError::MissingParameter("title".to_string()))?;
    let file = cmd
        .file
        .as_ref()
        .filter(|f| !f.filename.trim().is_empty())
        .ok_or_else(|| AppError::MissingParameter("file".to_string()))?;

    if !is_key_safe(owner_id) {
        return Err(AppError::InvalidParameter(
            "user_id must be at most 64 characters of [A-Za-z0-9_-]".to_string(),
        ));
    }

    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::ParameterTooLong {
            field: "title".to_string(),
            max: MAX_TITLE_CHARS,
        });
    }

    let description = cmd.description.as_deref().unwrap_or_default();
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::ParameterTooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_CHARS,
        });
    }

    if file.size > MAX_VIDEO_SIZE_BYTES {
        return Err(AppError::PayloadTooLarge {
            size: file.size,
            max: MAX_VIDEO_SIZE_BYTES,
        });
    }

    let (content_type, detected_format) = resolve_video_format(file).ok_or_else(|| {
        AppError::UnsupportedFormat(format!(
            "{} is not a supported video (allowed: {})",
            file.filename,
            ALLOWED_VIDEO_EXTENSIONS.join(", ")
        ))
    })?;

    let format = present(cmd.format.as_deref())
        .map(str::to_lowercase)
        .unwrap_or(detected_format);

    Ok(ValidatedUpload {
        owner_id: owner_id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        filename: file.filename.clone(),
        content_type,
        format,
        file_size: file.size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(filename: &str, content_type: Option<&str>, size: u64) -> UploadVideoCommand {
        UploadVideoCommand {
            user_id: Some("u1".to_string()),
            title: Some("t".to_string()),
            description: None,
            format: None,
            file: Some(FileDescriptor {
                filename: filename.to_string(),
                content_type: content_type.map(String::from),
                size,
            }),
        }
    }

    #[test]
    fn test_valid_mp4_passes() {
        let validated = validate_upload(&command("movie.mp4", Some("video/mp4"), 5 << 20)).unwrap();
        assert_eq!(validated.owner_id(), "u1");
        assert_eq!(validated.content_type(), "video/mp4");
        assert_eq!(validated.format(), "mp4");
        assert_eq!(validated.description(), "");
    }

    #[test]
    fn test_missing_fields() {
        let mut cmd = command("movie.mp4", Some("video/mp4"), 10);
        cmd.user_id = None;
        assert!(matches!(
            validate_upload(&cmd),
            Err(AppError::MissingParameter(f)) if f == "user_id"
        ));

        let mut cmd = command("movie.mp4", Some("video/mp4"), 10);
        cmd.title = Some("   ".to_string());
        assert!(matches!(
            validate_upload(&cmd),
            Err(AppError::MissingParameter(f)) if f == "title"
        ));

        let mut cmd = command("movie.mp4", Some("video/mp4"), 10);
        cmd.file = None;
        assert!(matches!(
            validate_upload(&cmd),
            Err(AppError::MissingParameter(f)) if f == "file"
        ));
    }

    #[test]
    fn test_owner_id_must_be_key_safe() {
        let mut cmd = command("movie.mp4", Some("video/mp4"), 10);
        cmd.user_id = Some("../other".to_string());
        assert!(matches!(
            validate_upload(&cmd),
            Err(AppError::InvalidParameter(_))
        ));

        cmd.user_id = Some("0b6d1a52-7f55-4a57-9d0e-3f0a4c8b1e22".to_string());
        assert!(validate_upload(&cmd).is_ok());
    }

    #[test]
    fn test_title_and_description_limits_count_chars() {
        let mut cmd = command("movie.mp4", Some("video/mp4"), 10);
        cmd.title = Some("é".repeat(MAX_TITLE_CHARS));
        assert!(validate_upload(&cmd).is_ok());

        cmd.title = Some("a".repeat(MAX_TITLE_CHARS + 1));
        assert!(matches!(
            validate_upload(&cmd),
            Err(AppError::ParameterTooLong { ref field, max: 100 }) if field == "title"
        ));

        let mut cmd = command("movie.mp4", Some("video/mp4"), 10);
        cmd.description = Some("d".repeat(MAX_DESCRIPTION_CHARS + 1));
        assert!(matches!(
            validate_upload(&cmd),
            Err(AppError::ParameterTooLong { ref field, max: 500 }) if field == "description"
        ));
    }

    #[test]
    fn test_size_ceiling_is_inclusive() {
        let exact = command("movie.mp4", Some("video/mp4"), MAX_VIDEO_SIZE_BYTES);
        assert!(validate_upload(&exact).is_ok());

        let over = command("movie.mp4", Some("video/mp4"), MAX_VIDEO_SIZE_BYTES + 1);
        assert!(matches!(
            validate_upload(&over),
            Err(AppError::PayloadTooLarge {
                size: 104_857_601,
                max: 104_857_600
            })
        ));
    }

    #[test]
    fn test_exe_without_video_mime_is_rejected() {
        let cmd = command("movie.exe", Some("application/octet-stream"), 10);
        assert!(matches!(
            validate_upload(&cmd),
            Err(AppError::UnsupportedFormat(_))
        ));

        let cmd = command("movie.exe", None, 10);
        assert!(matches!(
            validate_upload(&cmd),
            Err(AppError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_either_mime_or_extension_is_enough() {
        let by_extension = command("clip.MKV", Some("application/octet-stream"), 10);
        let validated = validate_upload(&by_extension).unwrap();
        assert_eq!(validated.content_type(), "video/x-matroska");
        assert_eq!(validated.format(), "mkv");

        let by_mime = command("clip", Some("video/webm; codecs=vp9"), 10);
        let validated = validate_upload(&by_mime).unwrap();
        assert_eq!(validated.content_type(), "video/webm");
        assert_eq!(validated.format(), "webm");
    }

    #[test]
    fn test_declared_format_is_kept() {
        let mut cmd = command("movie.mov", Some("video/quicktime"), 10);
        cmd.format = Some("MOV".to_string());
        assert_eq!(validate_upload(&cmd).unwrap().format(), "mov");
    }
}
