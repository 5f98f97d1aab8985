//! `.jwlibrary` archives: plain zip files holding `userData.db`, a
//! `manifest.json` and any media the user attached.

use crate::error::{ErrorKind, Result};
use crate::{DATABASE_FILE, MANIFEST_FILE};
use exn::ResultExt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::instrument;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// The contents of one archive, unpacked into a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedArchive {
    pub root: PathBuf,
    /// The embedded `userData.db`, if the archive has one.
    pub database: Option<PathBuf>,
    /// The archive's own `manifest.json`, if any.
    pub manifest: Option<PathBuf>,
    /// Every other file.
    pub payload: Vec<PathBuf>,
}

/// Unpack `archive` into `dir`.
///
/// Entries are flattened to their file names; directories are dropped and
/// entries whose names would escape `dir` are ignored. When two entries
/// share a file name the later one wins.
#[instrument(level = "debug", skip_all, fields(archive = %archive.display()))]
pub fn extract(archive: &Path, dir: &Path) -> Result<ExtractedArchive> {
    if !archive.is_file() {
        exn::bail!(ErrorKind::NotFound(archive.to_path_buf()));
    }
    let file = File::open(archive).or_raise(|| ErrorKind::Io(archive.to_path_buf()))?;
    let mut zip = ZipArchive::new(file).or_raise(|| ErrorKind::InvalidArchive(archive.to_path_buf()))?;
    fs::create_dir_all(dir).or_raise(|| ErrorKind::Io(dir.to_path_buf()))?;

    let mut extracted = ExtractedArchive { root: dir.to_path_buf(), ..Default::default() };
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).or_raise(|| ErrorKind::InvalidArchive(archive.to_path_buf()))?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = entry.enclosed_name().and_then(|path| path.file_name().map(|n| n.to_os_string())) else {
            tracing::warn!(archive = %archive.display(), entry = entry.name(), "Ignoring unsafe archive entry");
            continue;
        };
        let target = dir.join(&name);
        let mut out = File::create(&target).or_raise(|| ErrorKind::Io(target.clone()))?;
        io::copy(&mut entry, &mut out).or_raise(|| ErrorKind::InvalidArchive(archive.to_path_buf()))?;

        if name == DATABASE_FILE {
            extracted.database = Some(target);
        } else if name == MANIFEST_FILE {
            extracted.manifest = Some(target);
        } else if !extracted.payload.contains(&target) {
            extracted.payload.push(target);
        }
    }
    tracing::debug!(
        archive = %archive.display(),
        has_database = extracted.database.is_some(),
        payload = extracted.payload.len(),
        "Archive extracted"
    );
    Ok(extracted)
}

/// Write every regular file directly inside `dir` into a new deflated zip at
/// `archive`, replacing any existing file.
///
/// Entries are added in file name order.
#[instrument(level = "debug", skip_all, fields(archive = %archive.display()))]
pub fn create(dir: &Path, archive: &Path) -> Result<()> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).or_raise(|| ErrorKind::Io(dir.to_path_buf()))? {
        let path = entry.or_raise(|| ErrorKind::Io(dir.to_path_buf()))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    if let Some(parent) = archive.parent() {
        fs::create_dir_all(parent).or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
    }
    let out = File::create(archive).or_raise(|| ErrorKind::Io(archive.to_path_buf()))?;
    let mut zip = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for path in &files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            tracing::warn!(path = %path.display(), "Skipping file with a non UTF-8 name");
            continue;
        };
        zip.start_file(name, options).or_raise(|| ErrorKind::Io(archive.to_path_buf()))?;
        let mut input = File::open(path).or_raise(|| ErrorKind::Io(path.clone()))?;
        io::copy(&mut input, &mut zip).or_raise(|| ErrorKind::Io(path.clone()))?;
    }
    zip.finish().or_raise(|| ErrorKind::Io(archive.to_path_buf()))?;
    tracing::debug!(archive = %archive.display(), files = files.len(), "Archive created");
    Ok(())
}
