//! Durable key-value storage for gate state
//!
//! The gate writes its session and lockout state here after every mutation
//! and reads it back on startup.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

/// Storage failure
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// String key-value store with browser local-storage semantics
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// In-process store; clones share the same map
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON file
///
/// The whole map is rewritten on every change, via a temp file and rename.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

/// File name used inside a data directory
pub const STATE_FILE_NAME: &str = "auth_state.json";

impl FileStore {
    /// Open (or create) the state file inside `data_dir`
    pub fn in_dir(data_dir: &Path) -> Result<Self, StorageError> {
        Self::open(data_dir.join(STATE_FILE_NAME))
    }

    /// Open (or create) a state file at `path`
    ///
    /// A file that does not parse is treated as empty and replaced on the
    /// next write.
    pub fn open(path: PathBuf) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!("Ignoring unreadable state file {:?}: {}", path, e);
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let contents = serde_json::to_string_pretty(entries)?;

        // Write atomically
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &contents)?;
        fs::rename(&temp_path, &self.path)?;

        // Set restrictive permissions (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        debug!("Flushed {} state entries to {:?}", entries.len(), self.path);
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        if entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.set("k", "v").unwrap();
        assert_eq!(other.get("k").unwrap().as_deref(), Some("v"));

        other.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempdir().unwrap();

        {
            let store = FileStore::in_dir(dir.path()).unwrap();
            store.set("bat_auth_fail_v1", "2").unwrap();
            store.set("other", "x").unwrap();
            store.remove("other").unwrap();
        }

        let store = FileStore::in_dir(dir.path()).unwrap();
        assert_eq!(store.get("bat_auth_fail_v1").unwrap().as_deref(), Some("2"));
        assert!(store.get("other").unwrap().is_none());
        assert!(!dir.path().join("auth_state.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = FileStore::in_dir(dir.path()).unwrap();
        store.set("k", "v").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_starts_empty_on_malformed_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(STATE_FILE_NAME), "not json").unwrap();

        let store = FileStore::in_dir(dir.path()).unwrap();
        assert!(store.get("bat_auth_fail_v1").unwrap().is_none());

        store.set("bat_auth_fail_v1", "1").unwrap();
        let reopened = FileStore::in_dir(dir.path()).unwrap();
        assert_eq!(reopened.get("bat_auth_fail_v1").unwrap().as_deref(), Some("1"));
    }
}
