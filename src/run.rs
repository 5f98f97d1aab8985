//! The end-to-end merge: archives in, one archive out.

use crate::Console;
use crate::cli::{Cli, Input};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use jwlmerge_config::Config;
use jwlmerge_merge::{MergeEngine, MergeReport};
use jwlmerge_package::{DATABASE_FILE, ExtractedArchive, MANIFEST_FILE, Manifest, archive};
use jwlmerge_store::{Database, UserDataStore};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Template database looked up next to the executable when none is configured.
const BUNDLED_TEMPLATE: &str = "DB/userData.db";

/// Result of a successful run.
#[derive(Debug)]
pub struct Merged {
    pub output: PathBuf,
    pub report: MergeReport,
}

/// Directory holding the running executable; the working directory if that
/// can't be determined.
pub fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default()
}

/// Load configuration, collect the input archives and merge them.
pub async fn run<W: Write>(cli: &Cli, base_dir: &Path, console: &mut Console<W>) -> Result<Merged> {
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if let Some(output) = &cli.output {
        config.output_dir = Some(output.clone());
    }

    let archives = collect_archives(&cli.input(), base_dir, &config.archive_extension)?;
    if archives.len() < 2 {
        console.step(format_args!(
            "At least two .{} files are needed to merge, found {}.",
            config.archive_extension,
            archives.len()
        ));
        exn::bail!(ErrorKind::NotEnoughArchives(archives.len()));
    }
    merge_archives(&archives, &config, base_dir, console).await
}

/// The archives named by `input`, in merge order.
pub fn collect_archives(input: &Input, base_dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    match input {
        Input::Executable => jwlmerge_package::find_archives(base_dir, extension).or_raise(|| ErrorKind::Input),
        Input::Folder(dir) => jwlmerge_package::find_archives(dir, extension).or_raise(|| ErrorKind::Input),
        Input::Files(paths) => Ok(jwlmerge_package::filter_archives(paths.iter().cloned(), extension)),
    }
}

/// Merge `archives` in order into a new archive at `config`'s output path.
///
/// Archives without a database (or that aren't zip files at all) are
/// reported and skipped; their other files are still carried over. Files
/// with the same name in several archives end up as the last one's copy.
#[instrument(skip_all, fields(archives = archives.len()))]
pub async fn merge_archives<W: Write>(
    archives: &[PathBuf],
    config: &Config,
    base_dir: &Path,
    console: &mut Console<W>,
) -> Result<Merged> {
    let staging = tempfile::Builder::new().prefix("jwlmerge-").tempdir().or_raise(|| ErrorKind::Io(std::env::temp_dir()))?;
    let database_path = staging.path().join(DATABASE_FILE);

    console.step("Preparing database file.");
    let database = prepare_destination(config, base_dir, &database_path).await?;
    let destination = UserDataStore::new("merged", database.clone());
    let mut engine = MergeEngine::new(&destination).with_policy(config.broken_references);

    for path in archives {
        let label = path.file_name().map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        console.step(format_args!("Reading {label} file."));

        let scratch = tempfile::Builder::new().prefix("jwlmerge-").tempdir().or_raise(|| ErrorKind::Io(std::env::temp_dir()))?;
        let extracted = match extract(path, scratch.path()).await {
            Ok(extracted) => extracted,
            Err(err) if err.is_archive_level() => {
                engine.skip_snapshot(&label, err.to_string(), console);
                continue;
            },
            Err(err) => return Err(err).or_raise(|| ErrorKind::Archive(path.clone())),
        };

        match &extracted.database {
            Some(source_path) => {
                let source_db = Database::open_read_only(source_path).await.or_raise(|| ErrorKind::Archive(path.clone()))?;
                let source = UserDataStore::new(&label, source_db.clone());
                let merged = engine.merge_snapshot(&source, console).await.map(|_| ());
                source_db.close().await;
                merged.or_raise(|| ErrorKind::Merge)?;
            },
            None => engine.skip_snapshot(&label, format!("no {DATABASE_FILE} in archive"), console),
        }

        for file in &extracted.payload {
            carry_over(file, staging.path())?;
        }
    }

    let report = engine.finish().await.or_raise(|| ErrorKind::Merge)?;
    drop(destination);
    database.close().await;

    console.step("Creating manifest file.");
    let manifest = Manifest::for_database(&database_path, &report.last_modified, &config.device_name())
        .or_raise(|| ErrorKind::Package)?;
    manifest.write(&staging.path().join(MANIFEST_FILE)).or_raise(|| ErrorKind::Package)?;

    console.step("Creating jwlibrary file.");
    let output = config.output_path(base_dir);
    if output.exists() {
        fs::remove_file(&output).or_raise(|| ErrorKind::Io(output.clone()))?;
    }
    create(staging.path(), &output).await?;
    console.step(format_args!("Done. The file has been created in {}.", output.display()));

    tracing::info!(output = %output.display(), snapshots = report.snapshots.len(), skipped = report.skipped.len(), "Merge complete");
    Ok(Merged { output, report })
}

/// Create the destination database, starting from a template if one is
/// configured or bundled next to the executable.
async fn prepare_destination(config: &Config, base_dir: &Path, path: &Path) -> Result<Database> {
    let bundled = base_dir.join(BUNDLED_TEMPLATE);
    let template = config.template_database.clone().or_else(|| bundled.is_file().then_some(bundled));
    match template {
        Some(template) => {
            tracing::info!(template = %template.display(), "Starting from template database");
            fs::copy(&template, path).or_raise(|| ErrorKind::Io(template.clone()))?;
            Database::open(path).await.or_raise(|| ErrorKind::Destination)
        },
        None => Database::create(path).await.or_raise(|| ErrorKind::Destination),
    }
}

/// Move `file` into `dir`, replacing a same-named file.
fn carry_over(file: &Path, dir: &Path) -> Result<()> {
    let Some(name) = file.file_name() else {
        return Ok(());
    };
    let target = dir.join(name);
    if fs::rename(file, &target).is_err() {
        fs::copy(file, &target).or_raise(|| ErrorKind::Io(file.to_path_buf()))?;
    }
    Ok(())
}

async fn extract(archive: &Path, dir: &Path) -> jwlmerge_package::error::Result<ExtractedArchive> {
    let (archive, dir) = (archive.to_path_buf(), dir.to_path_buf());
    let task = tokio::task::spawn_blocking(move || archive::extract(&archive, &dir));
    match task.await {
        Ok(result) => result,
        Err(join) => Err(join).or_raise(|| jwlmerge_package::error::ErrorKind::Io(PathBuf::new())),
    }
}

async fn create(dir: &Path, output: &Path) -> Result<()> {
    let (dir, output) = (dir.to_path_buf(), output.to_path_buf());
    let task = tokio::task::spawn_blocking(move || archive::create(&dir, &output));
    task.await.or_raise(|| ErrorKind::Package)?.or_raise(|| ErrorKind::Package)
}
