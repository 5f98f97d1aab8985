//! Store Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The database could not be opened, read or written.
    #[display("database error")]
    Database,
    /// Applying the user data schema failed.
    #[display("could not apply user data schema")]
    Schema,
    #[display("database not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The row was rejected by a UNIQUE, FOREIGN KEY, NOT NULL or CHECK constraint.
    #[display("constraint violation: {_0}")]
    Constraint(#[error(not(source))] String),
    /// A stored value could not be represented (unexpected SQLite type).
    #[display("invalid data in {_0}")]
    InvalidData(#[error(not(source))] String),
    /// The row handed to the store doesn't fit its entity schema.
    #[display("invalid row for {_0}")]
    InvalidRow(#[error(not(source))] String),
    #[display("could not format timestamp")]
    Timestamp,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // SQLITE_BUSY surfaces as a generic database error; a single writer
        // shouldn't hit it, so nothing is worth retrying.
        false
    }

    /// Returns `true` if the failure concerns one row only and the rest of
    /// the table can still be processed.
    pub fn is_row_level(&self) -> bool {
        matches!(self, ErrorKind::Constraint(_) | ErrorKind::InvalidData(_) | ErrorKind::InvalidRow(_))
    }
}
