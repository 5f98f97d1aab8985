//! Merge Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Only run-fatal failures become errors; anything that
//! concerns a single row is reported as a
//! [`RowOutcome::Skipped`](crate::RowOutcome::Skipped) instead.

use crate::remap::BrokenReference;
use derive_more::{Display, Error};

/// A merge error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for merge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A source snapshot couldn't be read.
    #[display("could not read snapshot {_0}")]
    Source(#[error(not(source))] String),
    /// The destination couldn't be written or stamped.
    #[display("could not write to the destination")]
    Destination,
    /// A row referenced something that wasn't merged, and the policy is
    /// [`Fail`](crate::BrokenReferencePolicy::Fail).
    #[display("{_0}")]
    BrokenReference(#[error(not(source))] BrokenReference),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
