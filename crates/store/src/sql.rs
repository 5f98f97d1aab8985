//! SQL generated from the static entity descriptors.
//!
//! Table and column names come from `'static` descriptors, never from input,
//! so they are interpolated directly. Values are always bound.

use jwlmerge_model::EntitySchema;

/// Quote an identifier. Descriptor names never contain quotes, but `Type`,
/// `Value` and friends are close enough to keywords to warrant it.
fn ident(name: &str) -> String {
    format!("\"{name}\"")
}

fn column_list<'a>(columns: impl IntoIterator<Item = &'a str>) -> String {
    columns.into_iter().map(ident).collect::<Vec<_>>().join(", ")
}

pub(crate) fn select_all(schema: &EntitySchema) -> String {
    format!("SELECT {} FROM {}", column_list(schema.columns.iter().copied()), ident(schema.table))
}

/// First row whose `fields` equal the bound probe values.
///
/// With `null_as_empty` the stored side goes through `IFNULL(x, '')` and is
/// compared with `=`, so a NULL probe value matches nothing; otherwise
/// SQLite's NULL-safe `IS` is used.
pub(crate) fn select_matching(schema: &EntitySchema, fields: &[&str], null_as_empty: bool) -> String {
    let conditions = fields
        .iter()
        .map(|field| match null_as_empty {
            true => format!("IFNULL({}, '') = ?", ident(field)),
            false => format!("{} IS ?", ident(field)),
        })
        .collect::<Vec<_>>()
        .join(" AND ");
    format!("{} WHERE {conditions} ORDER BY rowid LIMIT 1", select_all(schema))
}

pub(crate) fn insert(schema: &EntitySchema) -> String {
    let columns: Vec<&str> = schema.insert_columns().collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!("INSERT INTO {} ({}) VALUES ({placeholders})", ident(schema.table), column_list(columns))
}
