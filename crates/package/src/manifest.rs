use crate::DATABASE_FILE;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;

/// User data schema version written to every manifest.
pub const SCHEMA_VERSION: u32 = 11;

/// `manifest.json`, describing the backup an archive holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,
    pub creation_date: String,
    pub version: u32,
    #[serde(rename = "type")]
    pub kind: u32,
    pub user_data_backup: UserDataBackup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataBackup {
    pub last_modified_date: String,
    pub device_name: String,
    pub database_name: String,
    /// Lowercase hex SHA-256 of the database file.
    pub hash: String,
    pub schema_version: u32,
}

impl Manifest {
    /// Describe a freshly merged database.
    ///
    /// `last_modified` is the value stamped into the database, and doubles
    /// as the backup's creation date.
    pub fn new(last_modified: &str, device_name: &str, hash: String) -> Self {
        Self {
            name: format!("JWLMerge_{last_modified}"),
            creation_date: last_modified.to_string(),
            version: 1,
            kind: 0,
            user_data_backup: UserDataBackup {
                last_modified_date: last_modified.to_string(),
                device_name: device_name.to_string(),
                database_name: DATABASE_FILE.to_string(),
                hash,
                schema_version: SCHEMA_VERSION,
            },
        }
    }

    /// Hash `database` and describe it.
    pub fn for_database(database: &Path, last_modified: &str, device_name: &str) -> Result<Self> {
        Ok(Self::new(last_modified, device_name, database_hash(database)?))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
        serde_json::from_reader(io::BufReader::new(file)).or_raise(|| ErrorKind::Manifest)
    }

    /// Write the manifest as compact JSON, replacing any existing file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec(self).or_raise(|| ErrorKind::Manifest)?;
        std::fs::write(path, json).or_raise(|| ErrorKind::Io(path.to_path_buf()))
    }
}

/// Lowercase hex SHA-256 of the file at `path`.
pub fn database_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("userData.db");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(database_hash(&path).unwrap(), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }

    #[test]
    fn test_json_layout() {
        let manifest = Manifest::new("2024-03-07T09:05:01Z", "laptop", "00ff".into());
        let json: serde_json::Value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "JWLMerge_2024-03-07T09:05:01Z",
                "creationDate": "2024-03-07T09:05:01Z",
                "version": 1,
                "type": 0,
                "userDataBackup": {
                    "lastModifiedDate": "2024-03-07T09:05:01Z",
                    "deviceName": "laptop",
                    "databaseName": "userData.db",
                    "hash": "00ff",
                    "schemaVersion": 11
                }
            })
        );
    }

    #[test]
    fn test_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let database = dir.path().join("userData.db");
        std::fs::write(&database, b"abc").unwrap();
        let manifest = Manifest::for_database(&database, "2024-03-07T09:05:01Z", "laptop").unwrap();

        let path = dir.path().join("manifest.json");
        std::fs::write(&path, b"stale").unwrap();
        manifest.write(&path).unwrap();
        assert_eq!(Manifest::read(&path).unwrap(), manifest);
    }
}
