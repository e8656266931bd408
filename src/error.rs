// src/error.rs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StrataError>;

/// Errors raised by the aggregation pipeline.
///
/// Record-level variants (`InvalidTimestamp`, `MissingDirectoryMapping`,
/// `DataAmbiguity`) are normally recovered inside a stage and only counted;
/// the rest abort the computation.
#[derive(Error, Debug)]
pub enum StrataError {
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("no directory mapping for id {0}")]
    MissingDirectoryMapping(usize),

    #[error("path `{path}` is used both as a file and as a directory")]
    DataAmbiguity { path: String },

    #[error("computation aborted")]
    Aborted,

    #[error("pipeline worker panicked")]
    WorkerPanicked,

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Git(#[from] git2::Error),
}

impl StrataError {
    pub fn invalid_timestamp(value: impl std::fmt::Display) -> Self {
        Self::InvalidTimestamp(value.to_string())
    }

    /// True for cooperative cancellation, so callers can tell "cancelled" apart
    /// from a successful empty result.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}
