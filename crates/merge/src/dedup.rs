use jwlmerge_model::{Entity, RowId};
use jwlmerge_store::SnapshotStore;
use jwlmerge_store::error::Result as StoreResult;

/// A destination row found to be the same entity as a source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Index into the entity's [`dedup`](jwlmerge_model::EntitySchema::dedup) criteria.
    pub criterion: usize,
    pub destination: RowId,
}

/// Business-key lookup for the entity types that are deduplicated across
/// snapshots (Location and Tag).
pub struct DeduplicationMatcher;

impl DeduplicationMatcher {
    /// Try each of the row's match criteria in priority order against
    /// `destination`, returning the first hit.
    ///
    /// Always `Ok(None)` for types without criteria. A matched row without a
    /// surrogate id can't be reused and counts as a miss.
    pub async fn find(destination: &dyn SnapshotStore, row: &Entity) -> StoreResult<Option<Match>> {
        for (criterion, criteria) in row.schema().dedup.iter().enumerate() {
            let found = destination.find_matching(row, criteria.fields, criteria.null_as_empty).await?;
            if let Some(id) = found.as_ref().and_then(Entity::id) {
                return Ok(Some(Match { criterion, destination: id }));
            }
        }
        Ok(None)
    }
}
