use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Upload lifecycle shared by `Video` and `UploadTask`.
///
/// Persisted as lowercase text. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Init,
    InProgress,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Init => "init",
            UploadStatus::InProgress => "in_progress",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Failed)
    }

    /// Transitions only move forward; nothing leaves a terminal state.
    pub fn can_transition_to(&self, next: UploadStatus) -> bool {
        match (self, next) {
            (UploadStatus::Init, UploadStatus::InProgress) => true,
            (UploadStatus::Init | UploadStatus::InProgress, next) => next.is_terminal(),
            _ => false,
        }
    }

    /// Status text values considered terminal, for SQL guards.
    pub fn terminal_values() -> [&'static str; 2] {
        [UploadStatus::Completed.as_str(), UploadStatus::Failed.as_str()]
    }
}

impl Display for UploadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(UploadStatus::Init),
            "in_progress" => Ok(UploadStatus::InProgress),
            "completed" => Ok(UploadStatus::Completed),
            "failed" => Ok(UploadStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid upload status: {}", s)),
        }
    }
}
