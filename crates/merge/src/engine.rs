use crate::dedup::DeduplicationMatcher;
use crate::error::{ErrorKind, Result};
use crate::event::{MergeEvent, MessageSink};
use crate::outcome::{MergeReport, RowOutcome, SkipReason, SkippedSnapshot, SnapshotSummary, TypeSummary};
use crate::remap::{BrokenReferencePolicy, MergeContext};
use exn::ResultExt;
use jwlmerge_model::{Entity, EntityGraph, EntityType};
use jwlmerge_store::SnapshotStore;
use tracing::instrument;

/// Merges source snapshots into one destination.
///
/// Each source gets one full pass over [`EntityGraph::order`]: rows are read,
/// their foreign keys rewritten through the snapshot's [`MergeContext`],
/// deduplicated where the type defines criteria, and inserted. Destination
/// content (and with it every Location and Tag available for matching)
/// accumulates across sources; id maps don't.
///
/// Rows are processed one at a time. Two identical rows in the same snapshot
/// must see each other, so a probe can never run ahead of the previous
/// row's insert.
///
/// # Examples
///
/// ```
/// use jwlmerge_merge::{Discard, MergeEngine};
/// use jwlmerge_store::{Database, UserDataStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let destination = UserDataStore::new("merged", Database::connect_in_memory().await.unwrap());
/// let a = UserDataStore::new("a", Database::connect_in_memory().await.unwrap());
/// let b = UserDataStore::new("b", Database::connect_in_memory().await.unwrap());
///
/// let report = MergeEngine::new(&destination).run(&[&a, &b], &mut Discard).await.unwrap();
/// assert_eq!(report.snapshots.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct MergeEngine<'a> {
    destination: &'a dyn SnapshotStore,
    policy: BrokenReferencePolicy,
    report: MergeReport,
}

impl<'a> MergeEngine<'a> {
    pub fn new(destination: &'a dyn SnapshotStore) -> Self {
        Self { destination, policy: BrokenReferencePolicy::default(), report: MergeReport::default() }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: BrokenReferencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Merge every source in order, then stamp the destination once.
    pub async fn run(mut self, sources: &[&dyn SnapshotStore], sink: &mut dyn MessageSink) -> Result<MergeReport> {
        for source in sources {
            self.merge_snapshot(*source, sink).await?;
        }
        self.finish().await
    }

    // =========================================================================
    // Incremental API
    // =========================================================================

    /// Merge one source snapshot into the destination.
    ///
    /// On a fatal error a [`MergeEvent::Failed`] is sent before the error is
    /// returned; the destination may then hold a partial snapshot.
    pub async fn merge_snapshot(
        &mut self,
        source: &dyn SnapshotStore,
        sink: &mut dyn MessageSink,
    ) -> Result<&SnapshotSummary> {
        sink.notify(&MergeEvent::SnapshotStarted { label: source.name().to_string() });
        match self.merge_in_order(source, EntityGraph::order()).await {
            Ok(summary) => {
                tracing::info!(snapshot = %summary.label, totals = ?summary.totals(), "Snapshot merged");
                sink.notify(&MergeEvent::SnapshotFinished { summary: summary.clone() });
                self.report.snapshots.push(summary);
                Ok(&self.report.snapshots[self.report.snapshots.len() - 1])
            },
            Err(err) => {
                sink.notify(&MergeEvent::Failed { message: err.to_string() });
                Err(err)
            },
        }
    }

    /// Record that a snapshot couldn't be merged at all.
    pub fn skip_snapshot(&mut self, label: impl Into<String>, reason: impl Into<String>, sink: &mut dyn MessageSink) {
        let skipped = SkippedSnapshot { label: label.into(), reason: reason.into() };
        tracing::warn!(snapshot = %skipped.label, reason = %skipped.reason, "Snapshot skipped");
        sink.notify(&MergeEvent::SnapshotSkipped { label: skipped.label.clone(), reason: skipped.reason.clone() });
        self.report.skipped.push(skipped);
    }

    /// Stamp the destination's modification time and hand back the report.
    pub async fn finish(mut self) -> Result<MergeReport> {
        self.report.last_modified =
            self.destination.stamp_modification_time().await.or_raise(|| ErrorKind::Destination)?;
        Ok(self.report)
    }

    // =========================================================================
    // Passes
    // =========================================================================

    /// One pass over `order` with a fresh [`MergeContext`].
    ///
    /// The public entry points always use [`EntityGraph::order`]; any other
    /// order is only useful to show what breaks.
    #[instrument(level = "debug", skip_all, fields(snapshot = %source.name()))]
    pub(crate) async fn merge_in_order(&self, source: &dyn SnapshotStore, order: &[EntityType]) -> Result<SnapshotSummary> {
        let mut ctx = MergeContext::new();
        let mut summary = SnapshotSummary::new(source.name());
        for entity in order {
            let rows = source.list_all(*entity).await.or_raise(|| ErrorKind::Source(source.name().to_string()))?;
            let mut counts = TypeSummary::default();
            for row in rows {
                let outcome = self.merge_row(&mut ctx, &row).await?;
                if let RowOutcome::Skipped(reason) = &outcome {
                    tracing::warn!(snapshot = %source.name(), entity = %entity, id = ?row.id(), %reason, "Row skipped");
                }
                counts.record(&outcome);
            }
            tracing::debug!(snapshot = %source.name(), entity = %entity, ?counts, "Entity type merged");
            summary.types.insert(*entity, counts);
        }
        Ok(summary)
    }

    async fn merge_row(&self, ctx: &mut MergeContext, row: &Entity) -> Result<RowOutcome> {
        let entity = row.kind();
        let source_id = row.id();
        let remapped = match ctx.remap(row) {
            Ok(remapped) => remapped,
            Err(broken) => match self.policy {
                BrokenReferencePolicy::Skip => return Ok(RowOutcome::Skipped(SkipReason::BrokenReference(broken))),
                BrokenReferencePolicy::Fail => exn::bail!(ErrorKind::BrokenReference(broken)),
            },
        };

        if remapped.schema().is_deduplicated() {
            match DeduplicationMatcher::find(self.destination, &remapped).await {
                Ok(Some(hit)) => {
                    tracing::debug!(entity = %entity, source = ?source_id, destination = hit.destination, criterion = hit.criterion, "Matched existing row");
                    if let Some(source) = source_id {
                        ctx.record(entity, source, hit.destination);
                    }
                    return Ok(RowOutcome::Matched { source: source_id, destination: hit.destination });
                },
                Ok(None) => {},
                Err(err) => return Ok(RowOutcome::Skipped(SkipReason::Lookup(err.to_string()))),
            }
        }

        match self.destination.insert(&remapped).await {
            Ok(destination) => {
                if let Some(source) = source_id {
                    ctx.record(entity, source, destination);
                }
                Ok(RowOutcome::Inserted { source: source_id, destination })
            },
            Err(err) if err.is_row_level() => Ok(RowOutcome::Skipped(SkipReason::Constraint(err.to_string()))),
            Err(err) => Err(err).or_raise(|| ErrorKind::Destination),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Discard;
    use jwlmerge_model::Value;
    use jwlmerge_store::MemoryStore;

    fn location(id: i64, book: i64, chapter: i64) -> Entity {
        Entity::empty(EntityType::Location)
            .with("LocationId", id)
            .with("BookNumber", book)
            .with("ChapterNumber", chapter)
            .with("KeySymbol", "nwt")
            .with("IssueTagNumber", 0)
            .with("MepsLanguage", 0)
            .with("Type", 0)
    }

    fn user_mark(id: i64, location: i64) -> Entity {
        Entity::empty(EntityType::UserMark)
            .with("UserMarkId", id)
            .with("ColorIndex", 1)
            .with("LocationId", location)
            .with("StyleIndex", 0)
            .with("UserMarkGuid", format!("guid-{id}"))
            .with("Version", 1)
    }

    fn tag(id: i64, name: &str) -> Entity {
        Entity::empty(EntityType::Tag).with("TagId", id).with("Type", 1).with("Name", name)
    }

    fn tag_map(id: i64, tag: i64, location: i64) -> Entity {
        Entity::empty(EntityType::TagMap)
            .with("TagMapId", id)
            .with("LocationId", location)
            .with("TagId", tag)
            .with("Position", 0)
    }

    fn input_field(location: i64, text_tag: &str) -> Entity {
        Entity::empty(EntityType::InputField)
            .with("LocationId", location)
            .with("TextTag", text_tag)
            .with("Value", "answer")
    }

    fn integer(row: &Entity, column: &str) -> Option<i64> {
        row.get(column).and_then(Value::as_integer)
    }

    async fn merge(destination: &MemoryStore, sources: &[&MemoryStore]) -> MergeReport {
        let sources: Vec<&dyn SnapshotStore> = sources.iter().map(|s| *s as &dyn SnapshotStore).collect();
        MergeEngine::new(destination).run(&sources, &mut Discard).await.unwrap()
    }

    #[tokio::test]
    async fn test_matching_location_is_reused_by_dependents() {
        let first = MemoryStore::with_rows("first", [location(5, 1, 1)]);
        let second = MemoryStore::with_rows("second", [location(12, 1, 1), user_mark(1, 12)]);
        let destination = MemoryStore::default();
        let report = merge(&destination, &[&first, &second]).await;

        let locations = destination.rows(EntityType::Location).await;
        assert_eq!(locations.len(), 1);
        let marks = destination.rows(EntityType::UserMark).await;
        assert_eq!(marks.len(), 1);
        assert_eq!(integer(&marks[0], "LocationId"), locations[0].id());
        assert_eq!(report.snapshots[1].get(EntityType::Location).matched, 1);
    }

    #[tokio::test]
    async fn test_matching_tag_is_shared_by_tag_maps() {
        let first = MemoryStore::with_rows("first", [location(1, 1, 1), tag(3, "Favorites"), tag_map(1, 3, 1)]);
        let second = MemoryStore::with_rows("second", [location(1, 2, 2), tag(9, "Favorites"), tag_map(4, 9, 1)]);
        let destination = MemoryStore::default();
        merge(&destination, &[&first, &second]).await;

        let tags = destination.rows(EntityType::Tag).await;
        assert_eq!(tags.len(), 1);
        let tag_maps = destination.rows(EntityType::TagMap).await;
        assert_eq!(tag_maps.len(), 2);
        assert!(tag_maps.iter().all(|row| integer(row, "TagId") == tags[0].id()));
        // Each TagMap keeps pointing at its own snapshot's Location.
        let locations: Vec<_> = tag_maps.iter().map(|row| integer(row, "LocationId")).collect();
        assert_eq!(locations, vec![Some(1), Some(2)]);
    }

    #[tokio::test]
    async fn test_duplicates_within_one_snapshot_collapse() {
        let source =
            MemoryStore::with_rows("source", [tag(1, "Favorites"), tag(2, "Favorites"), location(7, 1, 1), tag_map(1, 2, 7)]);
        let destination = MemoryStore::default();
        let report = merge(&destination, &[&source]).await;

        assert_eq!(destination.rows(EntityType::Tag).await.len(), 1);
        assert_eq!(report.total(EntityType::Tag), TypeSummary { inserted: 1, matched: 1, skipped: 0 });
        let tag_maps = destination.rows(EntityType::TagMap).await;
        assert_eq!(integer(&tag_maps[0], "TagId"), Some(1));
    }

    #[tokio::test]
    async fn test_non_deduplicated_types_are_conserved() {
        let first = MemoryStore::with_rows(
            "first",
            [location(1, 1, 1), input_field(1, "tt1"), input_field(1, "tt2"), user_mark(1, 1), user_mark(2, 1)],
        );
        let second = MemoryStore::with_rows("second", [location(4, 1, 1), input_field(4, "tt1"), user_mark(1, 4)]);
        let destination = MemoryStore::default();
        merge(&destination, &[&first, &second]).await;

        assert_eq!(destination.rows(EntityType::Location).await.len(), 1);
        assert_eq!(destination.rows(EntityType::InputField).await.len(), 3);
        assert_eq!(destination.rows(EntityType::UserMark).await.len(), 3);
    }

    #[tokio::test]
    async fn test_foreign_keys_point_at_merged_rows() {
        let first = MemoryStore::with_rows("first", [location(1, 1, 1), location(2, 1, 2), user_mark(10, 2)]);
        let second = MemoryStore::with_rows("second", [location(1, 40, 1), location(2, 1, 2), user_mark(10, 1)]);
        let destination = MemoryStore::default();
        merge(&destination, &[&first, &second]).await;

        let location_ids: Vec<_> = destination.rows(EntityType::Location).await.iter().filter_map(Entity::id).collect();
        for mark in destination.rows(EntityType::UserMark).await {
            let target = integer(&mark, "LocationId").unwrap();
            assert!(location_ids.contains(&target), "UserMark points at missing Location {target}");
        }
    }

    #[tokio::test]
    async fn test_dependents_before_dependencies_break() {
        let source = MemoryStore::with_rows("source", [location(5, 1, 1), user_mark(1, 5)]);
        let destination = MemoryStore::default();
        let engine = MergeEngine::new(&destination);

        let summary = engine.merge_in_order(&source, &[EntityType::UserMark, EntityType::Location]).await.unwrap();
        assert_eq!(summary.get(EntityType::UserMark), TypeSummary { inserted: 0, matched: 0, skipped: 1 });
        assert!(destination.rows(EntityType::UserMark).await.is_empty());

        let engine = MergeEngine::new(&destination).with_policy(BrokenReferencePolicy::Fail);
        let err = engine.merge_in_order(&source, &[EntityType::UserMark, EntityType::Location]).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::BrokenReference(broken) if broken.entity == EntityType::UserMark));
    }

    #[tokio::test]
    async fn test_destination_is_stamped_once() {
        let sources = [MemoryStore::new("a"), MemoryStore::new("b"), MemoryStore::new("c")];
        let destination = MemoryStore::default();
        let report = merge(&destination, &[&sources[0], &sources[1], &sources[2]]).await;
        assert_eq!(destination.stamps().await, vec![report.last_modified]);

        let destination = MemoryStore::default();
        merge(&destination, &[]).await;
        assert_eq!(destination.stamps().await.len(), 1);
    }

    #[tokio::test]
    async fn test_null_foreign_keys_are_kept() {
        let note = Entity::empty(EntityType::Note)
            .with("NoteId", 3)
            .with("Guid", "n3")
            .with("Title", "Unattached")
            .with("LastModified", "2024-01-01T00:00:00Z")
            .with("Created", "2024-01-01T00:00:00Z");
        let source = MemoryStore::with_rows("source", [note]);
        let destination = MemoryStore::default();
        merge(&destination, &[&source]).await;

        let notes = destination.rows(EntityType::Note).await;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].get("UserMarkId"), Some(&Value::Null));
        assert_eq!(notes[0].get("LocationId"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_bookmark_publication_location_is_remapped() {
        let bookmark = Entity::empty(EntityType::Bookmark)
            .with("BookmarkId", 1)
            .with("LocationId", 20)
            .with("PublicationLocationId", 21)
            .with("Slot", 0)
            .with("Title", "Genesis 1");
        let source = MemoryStore::with_rows("source", [location(20, 1, 1), location(21, 1, 2), bookmark]);
        // Pre-existing destination rows push the new ids away from the source ones.
        let destination = MemoryStore::with_rows("destination", [location(1, 66, 1), location(2, 66, 2)]);
        merge(&destination, &[&source]).await;

        let bookmarks = destination.rows(EntityType::Bookmark).await;
        assert_eq!(integer(&bookmarks[0], "LocationId"), Some(3));
        assert_eq!(integer(&bookmarks[0], "PublicationLocationId"), Some(4));
    }

    #[tokio::test]
    async fn test_failed_probe_skips_only_that_row() {
        let broken = location(2, 1, 2).with("KeySymbol", "corrupt");
        let source = MemoryStore::with_rows("source", [location(1, 1, 1), broken, location(3, 1, 3), user_mark(1, 2)]);
        let destination = MemoryStore::default().fail_probes_with("corrupt");
        let report = merge(&destination, &[&source]).await;

        assert_eq!(report.total(EntityType::Location), TypeSummary { inserted: 2, matched: 0, skipped: 1 });
        // The skipped Location takes its dependents with it.
        assert_eq!(report.total(EntityType::UserMark), TypeSummary { inserted: 0, matched: 0, skipped: 1 });
    }

    #[tokio::test]
    async fn test_rejected_insert_skips_only_that_row() {
        let source = MemoryStore::with_rows("source", [tag(1, "Favorites"), tag(2, "rejected"), tag(3, "Study")]);
        let destination = MemoryStore::default().reject_inserts_with("rejected");
        let report = merge(&destination, &[&source]).await;

        assert_eq!(report.total(EntityType::Tag), TypeSummary { inserted: 2, matched: 0, skipped: 1 });
        let names: Vec<_> =
            destination.rows(EntityType::Tag).await.iter().filter_map(|t| t.get("Name").cloned()).collect();
        assert_eq!(names, vec![Value::from("Favorites"), Value::from("Study")]);
    }

    #[tokio::test]
    async fn test_events() {
        let source = MemoryStore::with_rows("a.jwlibrary", [tag(1, "Favorites")]);
        let destination = MemoryStore::default();
        let mut events = Vec::new();
        let mut sink = |event: &MergeEvent| events.push(event.clone());

        let mut engine = MergeEngine::new(&destination);
        engine.merge_snapshot(&source, &mut sink).await.unwrap();
        engine.skip_snapshot("b.jwlibrary", "no userData.db", &mut sink);
        let report = engine.finish().await.unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0], MergeEvent::SnapshotStarted { label: "a.jwlibrary".into() });
        assert!(matches!(&events[1], MergeEvent::SnapshotFinished { summary } if summary.label == "a.jwlibrary"));
        assert_eq!(events[2].to_string(), "Skipped b.jwlibrary: no userData.db");
        assert_eq!(report.skipped.len(), 1);
    }

    #[tokio::test]
    async fn test_fatal_error_is_reported() {
        let source = MemoryStore::with_rows("a.jwlibrary", [user_mark(1, 99)]);
        let destination = MemoryStore::default();
        let mut events = Vec::new();
        let mut sink = |event: &MergeEvent| events.push(event.clone());

        let mut engine = MergeEngine::new(&destination).with_policy(BrokenReferencePolicy::Fail);
        assert!(engine.merge_snapshot(&source, &mut sink).await.is_err());
        assert!(matches!(events.last(), Some(MergeEvent::Failed { .. })));
        assert!(destination.stamps().await.is_empty());
    }
}
