//! End-to-end: real `.jwlibrary` archives in, one merged archive out.

use jwlmerge::Console;
use jwlmerge::cli::Cli;
use jwlmerge::error::ErrorKind;
use jwlmerge::run::{merge_archives, run};
use jwlmerge_config::Config;
use jwlmerge_model::{Entity, EntityType, Value};
use jwlmerge_package::{Manifest, database_hash};
use jwlmerge_store::{Database, SnapshotStore, UserDataStore};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

fn genesis_1() -> Entity {
    Entity::empty(EntityType::Location)
        .with("BookNumber", 1)
        .with("ChapterNumber", 1)
        .with("KeySymbol", "nwt")
        .with("IssueTagNumber", 0)
        .with("MepsLanguage", 0)
        .with("Type", 0)
}

/// A `userData.db` with one Location, a highlight on it and a tagged note.
async fn build_database(path: &Path, note: &str) {
    let store = UserDataStore::new("fixture", Database::create(path).await.unwrap());
    let location = store.insert(&genesis_1()).await.unwrap();
    store
        .insert(
            &Entity::empty(EntityType::UserMark)
                .with("ColorIndex", 1)
                .with("LocationId", location)
                .with("StyleIndex", 0)
                .with("UserMarkGuid", format!("mark-{note}"))
                .with("Version", 1),
        )
        .await
        .unwrap();
    let note = store
        .insert(
            &Entity::empty(EntityType::Note)
                .with("Guid", format!("note-{note}"))
                .with("LocationId", location)
                .with("Title", note)
                .with("LastModified", "2024-01-01T00:00:00Z")
                .with("Created", "2024-01-01T00:00:00Z")
                .with("BlockType", 0),
        )
        .await
        .unwrap();
    let tag = store.insert(&Entity::empty(EntityType::Tag).with("Type", 1).with("Name", "Favorites")).await.unwrap();
    store
        .insert(&Entity::empty(EntityType::TagMap).with("NoteId", note).with("TagId", tag).with("Position", 0))
        .await
        .unwrap();
    store.database().close().await;
}

fn write_archive(path: &Path, files: &[(&str, &Path)]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, source) in files {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        io::copy(&mut File::open(source).unwrap(), &mut zip).unwrap();
    }
    zip.finish().unwrap();
}

async fn backup(dir: &Path, name: &str, note: &str, extra: &[(&str, &[u8])]) -> PathBuf {
    let work = dir.join(format!("{name}.work"));
    fs::create_dir_all(&work).unwrap();
    let database = work.join("userData.db");
    build_database(&database, note).await;
    fs::write(work.join("manifest.json"), b"{}").unwrap();
    let mut files = vec![("userData.db".to_string(), database), ("manifest.json".to_string(), work.join("manifest.json"))];
    for (file, contents) in extra {
        fs::write(work.join(file), contents).unwrap();
        files.push((file.to_string(), work.join(file)));
    }
    let archive = dir.join(format!("{name}.jwlibrary"));
    let entries: Vec<_> = files.iter().map(|(n, p)| (n.as_str(), p.as_path())).collect();
    write_archive(&archive, &entries);
    archive
}

fn media_only(dir: &Path, name: &str, file: &str, contents: &[u8]) -> PathBuf {
    let source = dir.join(format!("{name}.{file}"));
    fs::write(&source, contents).unwrap();
    let archive = dir.join(format!("{name}.jwlibrary"));
    write_archive(&archive, &[(file, source.as_path())]);
    archive
}

fn unzip(archive: &Path, dir: &Path) -> Vec<String> {
    let mut zip = ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
    names.sort();
    for name in &names {
        let mut out = File::create(dir.join(name)).unwrap();
        io::copy(&mut zip.by_name(name).unwrap(), &mut out).unwrap();
        out.flush().unwrap();
    }
    names
}

#[tokio::test]
async fn test_merge_archives() {
    let dir = tempfile::tempdir().unwrap();
    let first = backup(dir.path(), "phone", "first", &[("shared.png", b"phone".as_slice())]).await;
    let media = media_only(dir.path(), "media", "photo.jpg", b"jpeg");
    let broken = dir.path().join("broken.jwlibrary");
    fs::write(&broken, b"not a zip").unwrap();
    let second = backup(dir.path(), "tablet", "second", &[("shared.png", b"tablet".as_slice())]).await;

    let config = Config { output_dir: Some(dir.path().join("out")), device_name: Some("test-rig".into()), ..Config::default() };
    let mut console = Console::new(Vec::new());
    let merged = merge_archives(&[first, media, broken, second], &config, dir.path(), &mut console).await.unwrap();

    assert_eq!(merged.output, dir.path().join("out/merged.jwlibrary"));
    assert_eq!(merged.report.snapshots.len(), 2);
    assert_eq!(merged.report.skipped.len(), 2);
    let printed = String::from_utf8(console.into_inner()).unwrap();
    assert!(printed.contains("Skipped media.jwlibrary"), "{printed}");
    assert!(printed.contains("Skipped broken.jwlibrary"), "{printed}");
    assert!(printed.contains("Done."), "{printed}");

    let unpacked = dir.path().join("unpacked");
    fs::create_dir_all(&unpacked).unwrap();
    let names = unzip(&merged.output, &unpacked);
    assert_eq!(names, vec!["manifest.json", "photo.jpg", "shared.png", "userData.db"]);
    // Later archives win on file name clashes.
    assert_eq!(fs::read(unpacked.join("shared.png")).unwrap(), b"tablet");

    let manifest = Manifest::read(&unpacked.join("manifest.json")).unwrap();
    assert_eq!(manifest.user_data_backup.hash, database_hash(&unpacked.join("userData.db")).unwrap());
    assert_eq!(manifest.user_data_backup.device_name, "test-rig");
    assert_eq!(manifest.user_data_backup.schema_version, 11);
    assert_eq!(manifest.creation_date, merged.report.last_modified);

    let db = Database::open_read_only(unpacked.join("userData.db")).await.unwrap();
    let store = UserDataStore::new("merged", db.clone());
    assert_eq!(store.list_all(EntityType::Location).await.unwrap().len(), 1);
    assert_eq!(store.list_all(EntityType::Tag).await.unwrap().len(), 1);
    assert_eq!(store.list_all(EntityType::UserMark).await.unwrap().len(), 2);
    let notes = store.list_all(EntityType::Note).await.unwrap();
    assert_eq!(notes.len(), 2);
    let tag_maps = store.list_all(EntityType::TagMap).await.unwrap();
    let note_ids: Vec<_> = notes.iter().filter_map(Entity::id).collect();
    assert_eq!(tag_maps.len(), 2);
    for row in &tag_maps {
        let note = row.get("NoteId").and_then(Value::as_integer).unwrap();
        assert!(note_ids.contains(&note));
    }
    db.close().await;
}

#[tokio::test]
async fn test_single_archive_is_not_enough() {
    let dir = tempfile::tempdir().unwrap();
    let only = media_only(dir.path(), "only", "photo.jpg", b"jpeg");
    let cli = Cli::try_parse_legacy_from(["jwlmerge".into(), "-files".into(), only.into_os_string()]).unwrap();
    let mut console = Console::new(Vec::new());
    let err = run(&cli, dir.path(), &mut console).await.unwrap_err();
    assert_eq!(*err, ErrorKind::NotEnoughArchives(1));
    let printed = String::from_utf8(console.into_inner()).unwrap();
    assert!(printed.contains("found 1"), "{printed}");
}
