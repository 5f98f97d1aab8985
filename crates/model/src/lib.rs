//! Entity model for JW Library user data.
//!
//! A user data snapshot (`userData.db`) is a small relational database. This
//! crate describes the fifteen tables that take part in a merge without
//! depending on any particular storage engine:
//!
//! - [`EntityType`] names each table and hands out its static
//!   [`EntitySchema`]: column list, surrogate id column, foreign keys and the
//!   business-key criteria used for deduplication.
//! - [`EntityGraph`] fixes the order in which types must be merged so that
//!   every foreign key target is processed before its dependents.
//! - [`Entity`] is one row, held as dynamically typed [`Value`]s in schema
//!   column order.

pub mod error;
mod graph;
mod record;
mod schema;
mod value;

pub use crate::graph::{EntityGraph, MERGE_ORDER};
pub use crate::record::Entity;
pub use crate::schema::{EntitySchema, EntityType, ForeignKey, MatchCriteria};
pub use crate::value::Value;

/// Surrogate row identifier, only meaningful inside the snapshot it came from.
pub type RowId = i64;
