//! Snapshot store trait and implementations.
//!
//! [`SnapshotStore`] is the persistence contract the merge engine is written
//! against: full table scans, a business-key probe, inserts that hand back a
//! freshly assigned id, and the final modification stamp.

#[cfg(any(test, feature = "mock"))]
mod memory;
mod sqlite;

#[cfg(any(test, feature = "mock"))]
pub use self::memory::MemoryStore;
pub use self::sqlite::UserDataStore;
use crate::error::Result;
use async_trait::async_trait;
use jwlmerge_model::{Entity, EntityType, RowId};

/// Unified interface over a user data snapshot.
///
/// The same trait serves both sides of a merge: sources are only ever
/// listed, the destination is probed, inserted into and stamped.
///
/// # Examples
///
/// ```
/// use jwlmerge_model::EntityType;
/// use jwlmerge_store::{SnapshotStore, error::Result};
///
/// async fn count_tags(store: &dyn SnapshotStore) -> Result<usize> {
///     Ok(store.list_all(EntityType::Tag).await?.len())
/// }
/// ```
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Label used in logs (usually the archive the snapshot came from).
    fn name(&self) -> &str;

    /// Every row of `entity`, in no particular order.
    ///
    /// A table that doesn't exist in the snapshot lists as empty.
    async fn list_all(&self, entity: EntityType) -> Result<Vec<Entity>>;

    /// The first row of `probe`'s type whose `fields` equal the probe's.
    ///
    /// With `null_as_empty`, a stored NULL compares as `''` and a NULL probe
    /// value matches nothing; otherwise NULL only equals NULL.
    async fn find_matching(&self, probe: &Entity, fields: &[&str], null_as_empty: bool) -> Result<Option<Entity>>;

    /// Insert `row` (its surrogate id, if any, is ignored) and return the
    /// id assigned by the store.
    ///
    /// Rows rejected by a table constraint fail with
    /// [`Constraint`](crate::error::ErrorKind::Constraint).
    async fn insert(&self, row: &Entity) -> Result<RowId>;

    /// Set the snapshot's last-modified time to now and return the value
    /// written, formatted as `yyyy-MM-ddTHH:mm:ssZ`.
    async fn stamp_modification_time(&self) -> Result<String>;
}
