//! Model Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use crate::EntityType;
use derive_more::{Display, Error};

/// A model error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A row was built with a different number of values than its schema has columns.
    #[display("{entity} expects {expected} values, got {actual}")]
    ColumnCount {
        entity: EntityType,
        expected: usize,
        actual: usize,
    },
    /// The column is not part of the entity's schema.
    #[display("{entity} has no column {column}")]
    UnknownColumn {
        entity: EntityType,
        column: String,
    },
    /// A merge order processes an entity before one of the types it references.
    #[display("{entity}.{column} references {references}, which is not merged before it")]
    OrderViolation {
        entity: EntityType,
        column: &'static str,
        references: EntityType,
    },
    /// The entity name doesn't match any known table.
    #[display("unknown entity type: {_0}")]
    UnknownEntity(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Schema mismatches don't fix themselves.
        false
    }
}
