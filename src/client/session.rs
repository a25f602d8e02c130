use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::db::models::teacher::TeacherProfile;

pub const TOKEN_KEY: &str = "token";
pub const TEACHER_KEY: &str = "teacher";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access session file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Session file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// String key/value pairs persisted as a JSON object in one file.
///
/// Every `set` and `remove` rewrites the file through a temporary sibling
/// and a rename, so a crash never leaves a half-written store behind.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl SessionStore {
    /// Loads the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(SessionStore { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.into());
        self.persist()
    }

    pub fn remove(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        let removed = self.entries.remove(key);
        self.persist()?;
        Ok(removed)
    }

    pub fn token(&self) -> Option<&str> {
        self.get(TOKEN_KEY)
    }

    /// The stored teacher profile, if present and readable.
    pub fn teacher(&self) -> Option<TeacherProfile> {
        self.get(TEACHER_KEY)
            .and_then(|raw| serde_json::from_str(raw).ok())
    }

    fn persist(&self) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let bytes = serde_json::to_vec_pretty(&self.entries).map_err(|source| {
            StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_opens_empty_and_writes_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut store = SessionStore::open(&path).unwrap();
        assert_eq!(store.token(), None);

        store.set(TOKEN_KEY, "abc").unwrap();
        store.set("other", "1").unwrap();
        assert_eq!(store.remove("other").unwrap().as_deref(), Some("1"));

        let reopened = SessionStore::open(&path).unwrap();
        assert_eq!(reopened.token(), Some("abc"));
        assert_eq!(reopened.get("other"), None);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            SessionStore::open(&path),
            Err(StoreError::Corrupt { .. })
        ));
    }
}
