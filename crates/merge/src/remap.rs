use jwlmerge_model::{Entity, EntityType, RowId};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// What to do with a row whose foreign key has no destination id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BrokenReferencePolicy {
    /// Log a warning and leave the row out.
    #[default]
    Skip,
    /// Abort the run.
    Fail,
}

/// A foreign key that couldn't be rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenReference {
    pub entity: EntityType,
    pub column: &'static str,
    pub references: EntityType,
    /// The source-local value found in the column, as text.
    pub value: String,
}

impl Display for BrokenReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}.{} = {} has no merged {}", self.entity, self.column, self.value, self.references)
    }
}

/// Source id to destination id, for one entity type.
#[derive(Debug, Default, Clone)]
pub struct IdMap(HashMap<RowId, RowId>);

impl IdMap {
    pub fn insert(&mut self, source: RowId, destination: RowId) {
        self.0.insert(source, destination);
    }

    pub fn get(&self, source: RowId) -> Option<RowId> {
        self.0.get(&source).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Id maps for one snapshot pass.
///
/// Source ids only mean something inside the snapshot they came from, so a
/// fresh context is created for every source; destination rows and
/// deduplication hits outlive it.
#[derive(Debug, Default)]
pub struct MergeContext {
    maps: BTreeMap<EntityType, IdMap>,
}

impl MergeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that source row `source` of `entity` lives at `destination`.
    pub fn record(&mut self, entity: EntityType, source: RowId, destination: RowId) {
        self.maps.entry(entity).or_default().insert(source, destination);
    }

    pub fn lookup(&self, entity: EntityType, source: RowId) -> Option<RowId> {
        self.maps.get(&entity).and_then(|map| map.get(source))
    }

    pub fn map(&self, entity: EntityType) -> Option<&IdMap> {
        self.maps.get(&entity)
    }

    /// Rewrite every foreign key of `row` to its destination id.
    ///
    /// NULL keys are optional references and stay NULL. Any other value must
    /// be an integer already recorded for the referenced type; the first one
    /// that isn't is returned as a [`BrokenReference`] and the row is left
    /// untouched.
    pub fn remap(&self, row: &Entity) -> Result<Entity, BrokenReference> {
        let mut remapped = row.clone();
        for fk in row.schema().foreign_keys {
            let value = row.get(fk.column).cloned().unwrap_or_default();
            if value.is_null() {
                continue;
            }
            let destination = value.as_integer().and_then(|source| self.lookup(fk.references, source));
            let Some(destination) = destination else {
                return Err(BrokenReference {
                    entity: row.kind(),
                    column: fk.column,
                    references: fk.references,
                    value: value.to_string(),
                });
            };
            // Descriptor foreign keys are always columns of their own table.
            let _ = remapped.set(fk.column, destination);
        }
        Ok(remapped)
    }
}
