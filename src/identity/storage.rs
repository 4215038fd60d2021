//! Durable key/value storage behind the session store.
//!
//! String keys and string values, scoped per backend origin, surviving restarts. Writes
//! are whole-document replacements so a reader never observes a half-written value.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};

use crate::error::{AppError, AppResult};

pub trait KeyValueStorage: Send + Sync {
    fn get_item(&self, key: &str) -> AppResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> AppResult<()>;
    /// Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> AppResult<()>;
}

/// Process-local storage. Nothing survives the process; used by tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        self.items.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> AppResult<()> {
        self.items.write().remove(key);
        Ok(())
    }
}

/// One JSON document per origin under a state directory.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // serialises read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn for_origin(state_dir: &Path, origin: &str) -> Self {
        let file = format!("{}.json", sanitize_origin(origin));
        Self { path: state_dir.join(file), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn read_all(&self) -> AppResult<BTreeMap<String, String>> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AppError::storage("corrupt_storage", format!("{}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> AppResult<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(items)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        let _g = self.write_lock.lock();
        let mut items = self.read_all()?;
        items.insert(key.to_string(), value.to_string());
        self.write_all(&items)
    }

    fn remove_item(&self, key: &str) -> AppResult<()> {
        let _g = self.write_lock.lock();
        let mut items = self.read_all()?;
        if items.remove(key).is_none() {
            return Ok(());
        }
        self.write_all(&items)
    }
}

fn sanitize_origin(origin: &str) -> String {
    origin
        .trim_end_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_roundtrip_and_idempotent_remove() {
        let s = MemoryStorage::new();
        assert_eq!(s.get_item("token").unwrap(), None);
        s.set_item("token", "a").unwrap();
        s.set_item("token", "b").unwrap();
        assert_eq!(s.get_item("token").unwrap().as_deref(), Some("b"));
        s.remove_item("token").unwrap();
        s.remove_item("token").unwrap();
        assert_eq!(s.get_item("token").unwrap(), None);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let a = FileStorage::for_origin(dir.path(), "http://localhost:3000");
        a.set_item("token", "T1").unwrap();
        let b = FileStorage::for_origin(dir.path(), "http://localhost:3000");
        assert_eq!(b.get_item("token").unwrap().as_deref(), Some("T1"));
        b.remove_item("token").unwrap();
        assert_eq!(a.get_item("token").unwrap(), None);
        b.remove_item("token").unwrap();
    }

    #[test]
    fn origins_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let a = FileStorage::for_origin(dir.path(), "http://localhost:3000");
        let b = FileStorage::for_origin(dir.path(), "https://library.example.com");
        a.set_item("token", "A").unwrap();
        assert_eq!(b.get_item("token").unwrap(), None);
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let s = FileStorage::for_origin(dir.path(), "http://x");
        std::fs::write(s.path(), b"{not json").unwrap();
        let e = s.get_item("token").unwrap_err();
        assert_eq!(e.code_str(), "corrupt_storage");
    }
}
