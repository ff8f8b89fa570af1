//! Object key generation.
//!
//! Keys are never derived from the client's base filename, so they cannot
//! collide or escape the owner's prefix.

use chrono::{DateTime, NaiveDate, Utc};
use std::path::Path;
use uuid::Uuid;

const KEY_PREFIX: &str = "videos";
const MAX_EXTENSION_CHARS: usize = 10;

/// Generate the storage key for a new upload, dated with the current UTC day.
pub fn generate_object_key(owner_id: &str, filename: &str) -> String {
    generate_object_key_at(owner_id, filename, Utc::now())
}

/// Like [`generate_object_key`] with an explicit clock reading.
pub fn generate_object_key_at(owner_id: &str, filename: &str, now: DateTime<Utc>) -> String {
    key_for_date(owner_id, filename, now.date_naive())
}

fn key_for_date(owner_id: &str, filename: &str, date: NaiveDate) -> String {
    format!(
        "{}/{}/{}/{}{}",
        KEY_PREFIX,
        owner_id,
        date.format("%Y-%m-%d"),
        Uuid::new_v4(),
        sanitized_extension(filename)
    )
}

/// `.ext` in lowercase, or empty if the filename has no usable extension.
fn sanitized_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| {
            !e.is_empty()
                && e.len() <= MAX_EXTENSION_CHARS
                && e.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}
