use crate::codec::{bind, classify, decode_entity};
use crate::db::Database;
use crate::error::{ErrorKind, Result};
use crate::{sql, stamp};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use jwlmerge_model::{Entity, EntityType, RowId};
use tracing::instrument;

use super::SnapshotStore;

static TABLE_EXISTS: &str = include_str!("../../queries/table_exists.sql");
static UPDATE_LAST_MODIFIED: &str = include_str!("../../queries/update_last_modified.sql");
static INSERT_LAST_MODIFIED: &str = include_str!("../../queries/insert_last_modified.sql");

/// [`SnapshotStore`] over a `userData.db` file.
///
/// All SQL is derived from the static [`EntitySchema`](jwlmerge_model::EntitySchema)
/// descriptors; there is one code path for all fifteen tables.
#[derive(Debug, Clone)]
pub struct UserDataStore {
    name: String,
    db: Database,
}

impl UserDataStore {
    pub fn new(name: impl Into<String>, db: Database) -> Self {
        Self { name: name.into(), db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    async fn table_exists(&self, entity: EntityType) -> Result<bool> {
        let (count,): (i64,) = sqlx::query_as(TABLE_EXISTS)
            .bind(entity.as_str())
            .fetch_one(self.db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(count > 0)
    }
}

#[async_trait]
impl SnapshotStore for UserDataStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "debug", skip(self), fields(store = %self.name))]
    async fn list_all(&self, entity: EntityType) -> Result<Vec<Entity>> {
        if !self.table_exists(entity).await? {
            tracing::warn!(store = %self.name, table = %entity, "Table missing from snapshot, treating as empty");
            return Ok(Vec::new());
        }
        let schema = entity.schema();
        let rows = sqlx::query(&sql::select_all(schema))
            .fetch_all(self.db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.iter().map(|row| decode_entity(schema, row)).collect()
    }

    async fn find_matching(&self, probe: &Entity, fields: &[&str], null_as_empty: bool) -> Result<Option<Entity>> {
        let schema = probe.schema();
        let statement = sql::select_matching(schema, fields, null_as_empty);
        let mut query = sqlx::query(&statement);
        for field in fields {
            let value = probe.get(field).ok_or_raise(|| ErrorKind::InvalidRow(format!("{}.{field}", schema.table)))?;
            query = bind(query, value);
        }
        let row = query.fetch_optional(self.db.pool()).await.or_raise(|| ErrorKind::Database)?;
        row.map(|row| decode_entity(schema, &row)).transpose()
    }

    async fn insert(&self, row: &Entity) -> Result<RowId> {
        let statement = sql::insert(row.schema());
        let mut query = sqlx::query(&statement);
        for (_, value) in row.insert_values() {
            query = bind(query, value);
        }
        match query.execute(self.db.pool()).await {
            Ok(result) => Ok(result.last_insert_rowid()),
            Err(e) => {
                let kind = classify(&e);
                Err(e).or_raise(|| kind)
            },
        }
    }

    #[instrument(level = "debug", skip(self), fields(store = %self.name))]
    async fn stamp_modification_time(&self) -> Result<String> {
        let now = stamp::now()?;
        let updated = sqlx::query(UPDATE_LAST_MODIFIED)
            .bind(now.as_str())
            .execute(self.db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        if updated.rows_affected() == 0 {
            sqlx::query(INSERT_LAST_MODIFIED)
                .bind(now.as_str())
                .execute(self.db.pool())
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        Ok(now)
    }
}
