//! Reading and writing `.jwlibrary` backup archives.
//!
//! - [`archive`] unpacks an input archive and packs the merged result.
//! - [`Manifest`] is the archive's `manifest.json`.
//! - [`find_archives`] and [`filter_archives`] turn command line input into
//!   a list of archives.

pub mod archive;
mod discover;
pub mod error;
mod manifest;

pub use crate::archive::ExtractedArchive;
pub use crate::discover::{filter_archives, find_archives, has_extension};
pub use crate::manifest::{Manifest, SCHEMA_VERSION, UserDataBackup, database_hash};

/// Name of the user data database inside an archive.
pub const DATABASE_FILE: &str = "userData.db";
/// Name of the manifest inside an archive.
pub const MANIFEST_FILE: &str = "manifest.json";
/// Default archive extension, without the dot.
pub const ARCHIVE_EXTENSION: &str = "jwlibrary";
