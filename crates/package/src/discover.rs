use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};

/// Whether `path` ends in `.{extension}`, ignoring case.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

/// Archives directly inside `dir`, sorted by path.
pub fn find_archives(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        exn::bail!(ErrorKind::NotFound(dir.to_path_buf()));
    }
    let mut archives = Vec::new();
    for entry in fs::read_dir(dir).or_raise(|| ErrorKind::Io(dir.to_path_buf()))? {
        let path = entry.or_raise(|| ErrorKind::Io(dir.to_path_buf()))?.path();
        if path.is_file() && has_extension(&path, extension) {
            archives.push(path);
        }
    }
    archives.sort();
    Ok(archives)
}

/// Keep the paths that exist and carry the archive extension, in the order given.
pub fn filter_archives(paths: impl IntoIterator<Item = PathBuf>, extension: &str) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter(|path| {
            let keep = path.is_file() && has_extension(path, extension);
            if !keep {
                tracing::warn!(path = %path.display(), "Ignoring input that is not an existing .{extension} file");
            }
            keep
        })
        .collect()
}
