use crate::error::{ErrorKind, Result};
use crate::{EntitySchema, EntityType, RowId, Value};

/// One row of an entity table.
///
/// Values are stored in [`EntitySchema::columns`] order, surrogate id
/// included (NULL for a row that hasn't been persisted yet).
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    kind: EntityType,
    values: Vec<Value>,
}

impl Entity {
    /// Build a row from values in schema column order.
    pub fn new(kind: EntityType, values: Vec<Value>) -> Result<Self> {
        let expected = kind.schema().columns.len();
        if values.len() != expected {
            exn::bail!(ErrorKind::ColumnCount { entity: kind, expected, actual: values.len() });
        }
        Ok(Self { kind, values })
    }

    /// An all-NULL row, to be filled in with [`with`](Self::with) or [`set`](Self::set).
    pub fn empty(kind: EntityType) -> Self {
        Self { kind, values: vec![Value::Null; kind.schema().columns.len()] }
    }

    /// Builder-style [`set`](Self::set) for constructing rows by column name.
    ///
    /// Unknown columns are ignored in release builds and panic in debug builds.
    #[must_use]
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        let known = self.set(column, value).is_ok();
        debug_assert!(known, "{} has no column {column}", self.kind);
        self
    }

    pub fn kind(&self) -> EntityType {
        self.kind
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.kind.schema()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.schema().column_index(column).map(|i| &self.values[i])
    }

    /// Replace the value of `column`, returning the previous value.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<Value> {
        let Some(index) = self.schema().column_index(column) else {
            exn::bail!(ErrorKind::UnknownColumn { entity: self.kind, column: column.to_string() });
        };
        Ok(std::mem::replace(&mut self.values[index], value.into()))
    }

    /// The row's surrogate id, if the table has one and it is set.
    pub fn id(&self) -> Option<RowId> {
        self.schema().id_column.and_then(|column| self.get(column)).and_then(Value::as_integer)
    }

    /// `(column, value)` pairs for every column written on insert.
    pub fn insert_values(&self) -> impl Iterator<Item = (&'static str, &Value)> + '_ {
        let id_column = self.schema().id_column;
        self.schema().columns.iter().copied().zip(self.values.iter()).filter(move |(c, _)| Some(*c) != id_column)
    }
}
