//! Durable key-value backends shared by the competitor and record stores.
//!
//! Each collection is written as a single JSON document under a fixed key.
//! Backends only move text around; the stores own (de)serialization.

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use uuid::Uuid;

use crate::{CupStackError, Result};

/// Key under which the competitor collection is stored.
pub const COMPETITORS_KEY: &str = "cupstacking_players";
/// Key under which the record collection is stored.
pub const RECORDS_KEY: &str = "cupstacking_records";

/// Fresh opaque identifier for a stored item.
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Current wall-clock time in epoch milliseconds.
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Minimal text storage interface.
pub trait KeyValueStore {
    /// Returns the stored value, or `None` when nothing was ever saved.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value stored under `key`.
    fn save(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-memory backend. Clones share the same map, which lets several stores
/// sit on one backend the way they would on a single browser storage area.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| CupStackError::msg("memory store has been poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Directory backed store that keeps one `<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) the data directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        tracing::debug!(root = %root.display(), "opened file store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }
}
