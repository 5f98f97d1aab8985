//! Merge several JW Library backups (`.jwlibrary` archives) into one.
//!
//! The binary is a thin shell around [`run::run`]; the pieces live in the
//! workspace crates:
//! - `jwlmerge-model`: the fifteen user data tables and their merge order;
//! - `jwlmerge-store`: SQLite access to `userData.db`;
//! - `jwlmerge-merge`: the merge engine itself;
//! - `jwlmerge-package`: archive extraction, creation and the manifest;
//! - `jwlmerge-config`: layered configuration.

pub mod cli;
mod console;
pub mod error;
pub mod logging;
pub mod run;

pub use crate::console::Console;
