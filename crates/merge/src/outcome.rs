use crate::remap::BrokenReference;
use jwlmerge_model::{EntityType, RowId};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Why a row was left out of the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A foreign key pointed at a row that wasn't merged.
    BrokenReference(BrokenReference),
    /// The deduplication probe against the destination failed.
    Lookup(String),
    /// The destination rejected the row.
    Constraint(String),
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SkipReason::BrokenReference(broken) => write!(f, "broken reference: {broken}"),
            SkipReason::Lookup(message) => write!(f, "lookup failed: {message}"),
            SkipReason::Constraint(message) => write!(f, "rejected by destination: {message}"),
        }
    }
}

/// What happened to a single source row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Written to the destination under a new id.
    Inserted { source: Option<RowId>, destination: RowId },
    /// Already present in the destination; the existing id is reused.
    Matched { source: Option<RowId>, destination: RowId },
    Skipped(SkipReason),
}

/// Row counts for one entity type of one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeSummary {
    pub inserted: usize,
    pub matched: usize,
    pub skipped: usize,
}

impl TypeSummary {
    pub fn record(&mut self, outcome: &RowOutcome) {
        match outcome {
            RowOutcome::Inserted { .. } => self.inserted += 1,
            RowOutcome::Matched { .. } => self.matched += 1,
            RowOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.inserted + self.matched + self.skipped
    }

    fn add(&mut self, other: &TypeSummary) {
        self.inserted += other.inserted;
        self.matched += other.matched;
        self.skipped += other.skipped;
    }
}

/// Per-type results of merging one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub label: String,
    pub types: BTreeMap<EntityType, TypeSummary>,
}

impl SnapshotSummary {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), types: BTreeMap::new() }
    }

    /// Counts for `entity`, all zero if the type had no rows.
    pub fn get(&self, entity: EntityType) -> TypeSummary {
        self.types.get(&entity).copied().unwrap_or_default()
    }

    /// Counts across every entity type.
    pub fn totals(&self) -> TypeSummary {
        let mut totals = TypeSummary::default();
        for summary in self.types.values() {
            totals.add(summary);
        }
        totals
    }
}

impl Display for SnapshotSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let totals = self.totals();
        write!(
            f,
            "{}: {} inserted, {} matched, {} skipped",
            self.label, totals.inserted, totals.matched, totals.skipped
        )
    }
}

/// A snapshot that was never merged (e.g. its archive had no database).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSnapshot {
    pub label: String,
    pub reason: String,
}

/// Everything a completed run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub snapshots: Vec<SnapshotSummary>,
    pub skipped: Vec<SkippedSnapshot>,
    /// The value written to the destination's `LastModified`.
    pub last_modified: String,
}

impl MergeReport {
    /// Counts for `entity` summed over every merged snapshot.
    pub fn total(&self, entity: EntityType) -> TypeSummary {
        let mut total = TypeSummary::default();
        for snapshot in &self.snapshots {
            total.add(&snapshot.get(entity));
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_summary_counts() {
        let mut summary = TypeSummary::default();
        summary.record(&RowOutcome::Inserted { source: Some(1), destination: 1 });
        summary.record(&RowOutcome::Matched { source: Some(2), destination: 1 });
        summary.record(&RowOutcome::Skipped(SkipReason::Lookup("database error".into())));
        summary.record(&RowOutcome::Inserted { source: None, destination: 2 });
        assert_eq!(summary, TypeSummary { inserted: 2, matched: 1, skipped: 1 });
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn test_snapshot_summary_display() {
        let mut summary = SnapshotSummary::new("backup.jwlibrary");
        summary.types.insert(EntityType::Location, TypeSummary { inserted: 3, matched: 2, skipped: 0 });
        summary.types.insert(EntityType::Tag, TypeSummary { inserted: 1, matched: 0, skipped: 1 });
        assert_eq!(summary.to_string(), "backup.jwlibrary: 4 inserted, 2 matched, 1 skipped");
        assert_eq!(summary.get(EntityType::Note), TypeSummary::default());
    }
}
