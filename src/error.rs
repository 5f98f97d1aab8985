//! Application Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An application error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    /// Fewer than two usable archives were given.
    #[display("at least two archives are needed to merge, found {_0}")]
    NotEnoughArchives(#[error(not(source))] usize),
    /// The input folder or files couldn't be read.
    #[display("could not collect input archives")]
    Input,
    #[display("could not prepare the destination database")]
    Destination,
    #[display("could not read archive {}", _0.display())]
    Archive(#[error(not(source))] PathBuf),
    #[display("merge failed")]
    Merge,
    #[display("could not write the merged archive")]
    Package,
    #[display("i/o error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io(_))
    }
}
