//! Key/value storage backing the `set-storage` / `get-storage` frames.
//!
//! Two areas mirror the browser model:
//! - session: lives as long as the process ([`MemoryStore`])
//! - local: JSON files in the platform config directory ([`FileStore`]):
//!   - Linux: `~/.config/dazzler/`
//!   - macOS: `~/Library/Application Support/dazzler/`
//!   - Windows: `%APPDATA%\dazzler\`

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use dazzler_shared::StorageArea;
use serde::{de::DeserializeOwned, Serialize};

/// String-keyed, string-valued store.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    /// Returns `true` if the value was stored.
    fn set_item(&self, key: &str, value: &str) -> bool;
    fn remove_item(&self, key: &str);
}

/// Process-lifetime store.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Option<String> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> bool {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        true
    }

    fn remove_item(&self, key: &str) {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
    }
}

/// One JSON file per key inside a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under `<config dir>/<app>`, if the platform has a config dir.
    pub fn in_config_dir(app: &str) -> Option<Self> {
        let dir = dirs::config_dir()?.join(app);
        Some(Self::new(dir))
    }

    fn file_path(&self, key: &str) -> Option<PathBuf> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir).ok()?;
        }
        // Percent-encoding keeps distinct identities in distinct files.
        let safe_key = urlencoding::encode(key);
        Some(self.dir.join(format!("{}.json", safe_key)))
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Option<String> {
        let path = self.file_path(key)?;
        std::fs::read_to_string(path).ok()
    }

    fn set_item(&self, key: &str, value: &str) -> bool {
        let Some(path) = self.file_path(key) else {
            return false;
        };
        std::fs::write(path, value).is_ok()
    }

    fn remove_item(&self, key: &str) {
        if let Some(path) = self.file_path(key) {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// The session and local areas together.
#[derive(Clone)]
pub struct Storage {
    session: Arc<dyn KeyValueStore>,
    local: Arc<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(session: Arc<dyn KeyValueStore>, local: Arc<dyn KeyValueStore>) -> Self {
        Self { session, local }
    }

    /// Both areas in memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    /// In-memory session, file-backed local storage for `app`. Falls back to
    /// memory when there is no config directory.
    pub fn for_app(app: &str) -> Self {
        let local: Arc<dyn KeyValueStore> = match FileStore::in_config_dir(app) {
            Some(store) => Arc::new(store),
            None => {
                crate::log_warn!("No config directory, local storage will not persist");
                Arc::new(MemoryStore::new())
            }
        };
        Self::new(Arc::new(MemoryStore::new()), local)
    }

    pub fn area(&self, area: StorageArea) -> &dyn KeyValueStore {
        match area {
            StorageArea::Session => self.session.as_ref(),
            StorageArea::Local => self.local.as_ref(),
        }
    }

    /// Save a value as JSON. Returns `true` on success.
    pub fn save<T: Serialize>(&self, area: StorageArea, key: &str, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.area(area).set_item(key, &json),
            Err(_) => false,
        }
    }

    /// Load a JSON value. `None` if missing or undecodable.
    pub fn load<T: DeserializeOwned>(&self, area: StorageArea, key: &str) -> Option<T> {
        let json = self.area(area).get_item(key)?;
        serde_json::from_str(&json).ok()
    }
}
