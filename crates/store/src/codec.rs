//! Conversion between [`Value`] and SQLite rows/arguments.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use jwlmerge_model::{Entity, EntitySchema, Value};
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::query::Query;
use sqlx::{Row, TypeInfo, ValueRef};

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Decode column `index` using the value's own storage class rather than
/// the declared column type; SQLite doesn't enforce the latter.
fn decode(row: &SqliteRow, index: usize, column: &str) -> Result<Value> {
    let raw = row.try_get_raw(index).or_raise(|| ErrorKind::InvalidData(column.to_string()))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage_class = raw.type_info().name().to_string();
    let value = match storage_class.as_str() {
        "INTEGER" | "BOOLEAN" => row.try_get::<i64, _>(index).map(Value::Integer),
        "REAL" => row.try_get::<f64, _>(index).map(Value::Real),
        "TEXT" => row.try_get::<String, _>(index).map(Value::Text),
        "BLOB" => row.try_get::<Vec<u8>, _>(index).map(Value::Blob),
        _ => exn::bail!(ErrorKind::InvalidData(format!("{column} ({storage_class})"))),
    };
    value.or_raise(|| ErrorKind::InvalidData(column.to_string()))
}

/// Decode a full row selected with [`select_all`](crate::sql::select_all).
pub(crate) fn decode_entity(schema: &EntitySchema, row: &SqliteRow) -> Result<Entity> {
    let values = schema
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| decode(row, index, &format!("{}.{column}", schema.table)))
        .collect::<Result<Vec<_>>>()?;
    Entity::new(schema.entity, values).or_raise(|| ErrorKind::InvalidRow(schema.table.to_string()))
}

pub(crate) fn bind<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<i64>),
        Value::Integer(i) => query.bind(*i),
        Value::Real(r) => query.bind(*r),
        Value::Text(s) => query.bind(s.clone()),
        Value::Blob(b) => query.bind(b.clone()),
    }
}

/// Map an insert failure to [`ErrorKind::Constraint`] when SQLite rejected
/// the row itself, [`ErrorKind::Database`] otherwise.
pub(crate) fn classify(err: &sqlx::Error) -> ErrorKind {
    use sqlx::error::ErrorKind as DbErrorKind;
    match err {
        sqlx::Error::Database(db) => match db.kind() {
            DbErrorKind::UniqueViolation
            | DbErrorKind::ForeignKeyViolation
            | DbErrorKind::NotNullViolation
            | DbErrorKind::CheckViolation => ErrorKind::Constraint(db.message().to_string()),
            _ => ErrorKind::Database,
        },
        _ => ErrorKind::Database,
    }
}
