//! SQLite storage for JW Library user data snapshots.
//!
//! A snapshot is one `userData.db`. This crate opens snapshots
//! ([`Database`]), and exposes them to the merge engine through the
//! [`SnapshotStore`] trait:
//! - [`UserDataStore`] is the real implementation, generating all of its SQL
//!   from the static entity descriptors in `jwlmerge-model`.
//! - `MemoryStore` (behind the `mock` feature) keeps rows in memory and can
//!   inject failures, for testing code written against the trait.

pub mod backend;
mod codec;
mod db;
pub mod error;
mod sql;
mod stamp;

#[cfg(any(test, feature = "mock"))]
pub use crate::backend::MemoryStore;
pub use crate::backend::{SnapshotStore, UserDataStore};
pub use crate::db::Database;
pub use crate::stamp::format_timestamp;
