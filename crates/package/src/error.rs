//! Package Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A packaging error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for packaging operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file isn't a readable zip archive. Skip it and carry on.
    #[display("not a valid archive: {}", _0.display())]
    InvalidArchive(#[error(not(source))] PathBuf),
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Reading or writing a file failed.
    #[display("i/o error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// The manifest couldn't be serialized or parsed.
    #[display("invalid manifest")]
    Manifest,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io(_))
    }

    /// Returns `true` if the error concerns one input archive, which can be
    /// skipped without abandoning the whole run.
    pub fn is_archive_level(&self) -> bool {
        matches!(self, ErrorKind::InvalidArchive(_))
    }
}
