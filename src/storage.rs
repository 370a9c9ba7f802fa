#[cfg(test)]
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Total bytes a store accepts before refusing writes.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),
    #[error("could not serialize value: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// String key/value persistence with synchronous writes.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

fn check_quota(used_by_others: usize, key: &str, value: &str, quota: usize) -> Result<(), StorageError> {
    let needed = used_by_others + key.len() + value.len();
    if needed > quota {
        return Err(StorageError::QuotaExceeded { needed, quota });
    }
    Ok(())
}

/// One file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    quota: usize,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>, quota: usize) -> Self {
        FileStore { dir: dir.into(), quota }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }

    fn used_except(&self, except: &Path) -> Result<usize, StorageError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut total = 0;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path == except {
                continue;
            }
            let name_len = path.file_stem().map(|s| s.len()).unwrap_or(0);
            total += name_len + entry.metadata()?.len() as usize;
        }
        Ok(total)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        check_quota(self.used_except(&path)?, key, value, self.quota)?;

        fs::create_dir_all(&self.dir)?;
        // Replace atomically.
        let tmp = path.with_extension("json.tmp");
        let written = fs::write(&tmp, value).and_then(|()| fs::rename(&tmp, &path));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                tracing::debug!(path = %tmp.display(), error = %cleanup, "could not remove temp file");
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[derive(Debug, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    quota: usize,
}

#[cfg(test)]
impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::with_quota(DEFAULT_QUOTA_BYTES)
    }
}

#[cfg(test)]
impl MemoryStore {
    pub fn with_quota(quota: usize) -> Self {
        MemoryStore {
            values: HashMap::new(),
            quota,
        }
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let used: usize = self
            .values
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        check_quota(used, key, value, self.quota)?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("storage"), DEFAULT_QUOTA_BYTES);

        assert_eq!(store.get("khayal_history").unwrap(), None);
        store.set("khayal_history", "[1,2]").unwrap();
        assert_eq!(store.get("khayal_history").unwrap().as_deref(), Some("[1,2]"));

        store.set("khayal_history", "[3]").unwrap();
        assert_eq!(store.get("khayal_history").unwrap().as_deref(), Some("[3]"));

        store.remove("khayal_history").unwrap();
        assert_eq!(store.get("khayal_history").unwrap(), None);
        // Removing a missing key is fine.
        store.remove("khayal_history").unwrap();
    }

    #[test]
    fn test_file_store_quota() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path(), 20);

        store.set("a", "0123456789").unwrap();
        let err = store.set("b", "0123456789").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert_eq!(store.get("b").unwrap(), None);

        // Overwriting a key does not count its old value.
        store.set("a", "0123456789abcdef").unwrap();
        assert!(store.set("a", "0123456789abcdefghijk").is_err());
        assert_eq!(store.get("a").unwrap().as_deref(), Some("0123456789abcdef"));
    }

    #[test]
    fn test_file_store_failed_replace_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path(), DEFAULT_QUOTA_BYTES);

        // A directory in place of the value file makes the rename fail.
        let blocker = dir.path().join("k.json");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("inner"), "x").unwrap();

        assert!(matches!(store.set("k", "value"), Err(StorageError::Io(_))));
        assert!(!dir.path().join("k.json.tmp").exists());
    }

    #[test]
    fn test_memory_store_quota() {
        let mut store = MemoryStore::with_quota(8);
        store.set("k", "1234567").unwrap();
        assert!(matches!(
            store.set("k", "12345678"),
            Err(StorageError::QuotaExceeded { needed: 9, quota: 8 })
        ));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("1234567"));
    }
}
