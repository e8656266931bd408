// src/model.rs

use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch, UTC.
pub type Timestamp = i64;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// How a file was touched by a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    TypeChanged,
}

impl ChangeStatus {
    /// Maps a libgit2 delta onto a change status. Deltas that do not describe
    /// a committed change (unmodified, ignored, conflicted, ...) map to `None`.
    pub fn from_delta(delta: git2::Delta) -> Option<Self> {
        match delta {
            git2::Delta::Added => Some(Self::Added),
            git2::Delta::Modified => Some(Self::Modified),
            git2::Delta::Deleted => Some(Self::Deleted),
            git2::Delta::Renamed => Some(Self::Renamed),
            git2::Delta::Copied => Some(Self::Copied),
            git2::Delta::Typechange => Some(Self::TypeChanged),
            _ => None,
        }
    }
}

/// One row per (file, commit) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeEvent {
    /// Forward-slash separated path relative to the repository root
    pub path: String,
    /// Previous path of a renamed file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    pub status: ChangeStatus,
    pub commit: String,
    pub timestamp: Timestamp,
    pub author_name: String,
    pub author_email: String,
    pub subject: String,
}

impl FileChangeEvent {
    /// Key used to tell authors apart; email when present, otherwise the name.
    pub fn author_key(&self) -> &str {
        if self.author_email.is_empty() {
            &self.author_name
        } else {
            &self.author_email
        }
    }
}

/// A weighted co-change relation between two files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingEdge {
    pub source: String,
    pub target: String,
    /// Normalized co-change strength in [0, 1]
    pub strength: f64,
    /// Number of commits touching both files
    pub co_changes: usize,
}

/// The flattened history of a repository
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepositoryHistory {
    pub events: Vec<FileChangeEvent>,
    pub commits_analyzed: usize,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}
