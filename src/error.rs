use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaffError {
    #[error("container not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("malformed container: {0}")]
    Format(String),

    #[error("partition index {index} out of range (count {count})")]
    Range { index: usize, count: usize },

    #[error("checksum mismatch at partition {index} (expected {expected}, got {actual})")]
    Checksum {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("range insert unavailable at offset {offset} len {len}: {reason}")]
    UnsupportedRangeInsert { offset: u64, len: u64, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PaffError {
    pub(crate) fn format<S: Into<String>>(msg: S) -> Self {
        PaffError::Format(msg.into())
    }

    pub(crate) fn unsupported<S: Into<String>>(offset: u64, len: u64, reason: S) -> Self {
        PaffError::UnsupportedRangeInsert {
            offset,
            len,
            reason: reason.into(),
        }
    }

    /// Map a failed open() of the container itself: missing or unreadable => NotFound.
    pub(crate) fn from_open(path: &std::path::Path, e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                PaffError::NotFound {
                    path: path.to_path_buf(),
                }
            }
            _ => PaffError::Io(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, PaffError>;
