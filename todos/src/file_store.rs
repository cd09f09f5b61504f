//! File-backed [`KeyValueStore`]: one file per key in a directory.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tasklist_core::storage::{KeyValueStore, StorageError};

/// Key-value store keeping each value in its own file
///
/// Writes go to a temporary file that is then renamed over the target, so a
/// reader sees either the old value or the new one. A missing file is an
/// absent key.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Use `dir`, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if the directory cannot be
    /// created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|error| {
            StorageError::Unavailable(format!("cannot create {}: {error}", dir.display()))
        })?;
        tracing::debug!(dir = %dir.display(), "Opened file store");
        Ok(Self { dir })
    }

    /// Directory holding the files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a key is stored in
    ///
    /// Anything outside `[A-Za-z0-9_-]` is escaped, so keys never leave the
    /// directory.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                name.push(char::from(byte));
            } else {
                let _ = write!(name, "%{byte:02X}");
            }
        }
        self.dir.join(name)
    }
}

fn io_error(key: &str, source: io::Error) -> StorageError {
    if source.kind() == io::ErrorKind::StorageFull {
        StorageError::QuotaExceeded {
            key: key.to_string(),
        }
    } else {
        StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(io_error(key, error)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp_path = path.with_extension("tmp");

        fs::write(&tmp_path, value).map_err(|error| io_error(key, error))?;
        if let Err(error) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_error(key, error));
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => Err(io_error(key, error)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::open(dir.path()).unwrap();

        assert_eq!(store.get("vue-todo-app").unwrap(), None);
        store.set("vue-todo-app", "[]").unwrap();
        assert_eq!(store.get("vue-todo-app").unwrap().as_deref(), Some("[]"));

        store.set("vue-todo-app", "[1]").unwrap();
        assert_eq!(store.get("vue-todo-app").unwrap().as_deref(), Some("[1]"));

        store.remove("vue-todo-app").unwrap();
        assert_eq!(store.get("vue-todo-app").unwrap(), None);
        store.remove("vue-todo-app").unwrap();
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        let store = FileKeyValueStore::open(&nested).unwrap();
        store.set("themeMode", "dark").unwrap();

        assert!(nested.join("themeMode").is_file());
    }

    #[test]
    fn keys_stay_inside_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::open(dir.path()).unwrap();

        let path = store.path_for("../escape/key.json");
        assert_eq!(path.parent(), Some(dir.path()));
        assert_eq!(path.file_name().unwrap(), "%2E%2E%2Fescape%2Fkey%2Ejson");
    }

    #[test]
    fn leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::open(dir.path()).unwrap();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();

        let mut names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn unreadable_path_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::open(dir.path()).unwrap();
        fs::create_dir(store.path_for("taken")).unwrap();

        assert!(matches!(store.get("taken"), Err(StorageError::Io { .. })));
        assert!(store.set("taken", "x").is_err());
    }
}
