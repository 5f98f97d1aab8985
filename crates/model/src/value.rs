use std::fmt::{Display, Formatter, Result as FmtResult};

/// A single dynamically typed column value, mirroring SQLite's storage classes.
///
/// Values are carried through a merge untouched; only foreign key columns are
/// rewritten, and those are always [`Integer`](Self::Integer) or
/// [`Null`](Self::Null).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Replace NULL with the empty string, leaving every other value as-is.
    ///
    /// This is the `IFNULL(value, '')` normalisation applied to the stored
    /// side of the null-as-empty match criteria.
    #[must_use]
    pub fn null_as_empty(&self) -> Value {
        match self {
            Value::Null => Value::Text(String::new()),
            other => other.clone(),
        }
    }

    /// Equality with SQLite's `IS` semantics: NULL only equals NULL.
    pub fn is(&self, other: &Value) -> bool {
        self == other
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}
impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}
impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}
impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}
impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
