//! In-memory snapshot store for testing.

use crate::error::{ErrorKind, Result};
use crate::stamp;
use async_trait::async_trait;
use exn::ResultExt;
use jwlmerge_model::{Entity, EntityType, RowId, Value};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::SnapshotStore;

#[derive(Default)]
struct State {
    tables: BTreeMap<EntityType, Vec<Entity>>,
    stamps: Vec<String>,
}

/// In-memory snapshot store for testing.
///
/// Rows are kept in a `BTreeMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self`. Rows seeded with [`with_rows`](Self::with_rows)
/// keep their ids (a source snapshot); inserted rows get the next free id of
/// their table (a destination).
///
/// Failures can be injected per value: a probe or insert carrying a poisoned
/// value fails, everything else behaves normally.
pub struct MemoryStore {
    name: String,
    state: RwLock<State>,
    failing_probes: Vec<Value>,
    rejected_inserts: Vec<Value>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(State::default()),
            failing_probes: Vec::new(),
            rejected_inserts: Vec::new(),
        }
    }

    /// Create a store pre-populated with rows, ids kept as given.
    pub fn with_rows(name: impl Into<String>, rows: impl IntoIterator<Item = Entity>) -> Self {
        let mut state = State::default();
        for row in rows {
            state.tables.entry(row.kind()).or_default().push(row);
        }
        Self { state: RwLock::new(state), ..Self::new(name) }
    }

    /// Make [`find_matching`](SnapshotStore::find_matching) fail for any
    /// probe whose key fields contain `value`.
    #[must_use]
    pub fn fail_probes_with(mut self, value: impl Into<Value>) -> Self {
        self.failing_probes.push(value.into());
        self
    }

    /// Make [`insert`](SnapshotStore::insert) reject any row containing
    /// `value` as a constraint violation.
    #[must_use]
    pub fn reject_inserts_with(mut self, value: impl Into<Value>) -> Self {
        self.rejected_inserts.push(value.into());
        self
    }

    /// Current rows of `entity`, in insertion order.
    pub async fn rows(&self, entity: EntityType) -> Vec<Entity> {
        self.state.read().await.tables.get(&entity).cloned().unwrap_or_default()
    }

    /// Every value written by [`stamp_modification_time`](SnapshotStore::stamp_modification_time).
    pub async fn stamps(&self) -> Vec<String> {
        self.state.read().await.stamps.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

fn field_matches(probe: &Value, stored: &Value, null_as_empty: bool) -> bool {
    match null_as_empty {
        true => !probe.is_null() && *probe == stored.null_as_empty(),
        false => probe.is(stored),
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_all(&self, entity: EntityType) -> Result<Vec<Entity>> {
        Ok(self.rows(entity).await)
    }

    async fn find_matching(&self, probe: &Entity, fields: &[&str], null_as_empty: bool) -> Result<Option<Entity>> {
        let mut key = Vec::with_capacity(fields.len());
        for field in fields {
            let Some(value) = probe.get(field) else {
                exn::bail!(ErrorKind::InvalidRow(format!("{}.{field}", probe.kind())));
            };
            if self.failing_probes.contains(value) {
                exn::bail!(ErrorKind::Database);
            }
            key.push((*field, value));
        }
        let state = self.state.read().await;
        let found = state.tables.get(&probe.kind()).and_then(|rows| {
            rows.iter().find(|row| {
                key.iter().all(|(field, value)| {
                    row.get(field).is_some_and(|stored| field_matches(value, stored, null_as_empty))
                })
            })
        });
        Ok(found.cloned())
    }

    async fn insert(&self, row: &Entity) -> Result<RowId> {
        if let Some((column, value)) = row.insert_values().find(|(_, value)| self.rejected_inserts.contains(value)) {
            exn::bail!(ErrorKind::Constraint(format!("{}.{column} rejected {value}", row.kind())));
        }
        let mut state = self.state.write().await;
        let rows = state.tables.entry(row.kind()).or_default();
        let id = match row.schema().id_column {
            Some(_) => rows.iter().filter_map(Entity::id).max().unwrap_or(0) + 1,
            None => RowId::try_from(rows.len()).or_raise(|| ErrorKind::Database)? + 1,
        };
        let mut stored = row.clone();
        if let Some(column) = row.schema().id_column {
            stored.set(column, id).or_raise(|| ErrorKind::InvalidRow(row.kind().to_string()))?;
        }
        rows.push(stored);
        Ok(id)
    }

    async fn stamp_modification_time(&self) -> Result<String> {
        let now = stamp::now()?;
        self.state.write().await.stamps.push(now.clone());
        Ok(now)
    }
}
