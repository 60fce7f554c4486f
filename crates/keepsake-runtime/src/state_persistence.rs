//! Visitor preference persistence.
//!
//! The page remembers a handful of small preferences between visits (today
//! only whether music is enabled). They live in a [`PreferenceStore`] that
//! caches values in memory and delegates durable storage to a
//! [`StorageBackend`].
//!
//! ```text
//! PreferenceStore  (cache + dirty flag)
//!        │ load / flush
//!        ▼
//! StorageBackend   MemoryStorage | FileStorage (JSON, write-rename)
//! ```
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Backend unavailable | Store runs memory-only, `flush` is a no-op |
//! | `StorageError::Io` | Returned to the caller, cache unaffected |
//! | `StorageError::Serialization` | File ignored on load, reported on save |
//! | Format version mismatch | Stored values ignored, logged |
//!
//! Storage failures never panic; the page treats them as "no preference".

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization error: {0}")]
    Serialization(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Key/value persistence used by [`PreferenceStore`].
pub trait StorageBackend: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Read every stored entry. A backend with nothing stored yet returns
    /// an empty map.
    fn load_all(&self) -> StorageResult<BTreeMap<String, Value>>;

    /// Replace everything stored with `entries`.
    fn save_all(&self, entries: &BTreeMap<String, Value>) -> StorageResult<()>;

    /// Remove everything stored.
    fn clear(&self) -> StorageResult<()>;

    /// Whether the backend can be written. Private browsing and read-only
    /// disks report `false`.
    fn is_available(&self) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Storage
// ─────────────────────────────────────────────────────────────────────────────

/// Volatile backend. Clones share the same entries.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<BTreeMap<String, Value>>>,
    unavailable: bool,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated storage.
    #[must_use]
    pub fn with_entries(entries: BTreeMap<String, Value>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries)),
            unavailable: false,
        }
    }

    /// A backend that refuses every operation.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Snapshot of what is stored.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check(&self) -> StorageResult<()> {
        if self.unavailable {
            Err(StorageError::Unavailable("memory storage disabled".into()))
        } else {
            Ok(())
        }
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &str {
        "MemoryStorage"
    }

    fn load_all(&self) -> StorageResult<BTreeMap<String, Value>> {
        self.check()?;
        Ok(self.snapshot())
    }

    fn save_all(&self, entries: &BTreeMap<String, Value>) -> StorageResult<()> {
        self.check()?;
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = entries.clone();
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.check()?;
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }

    fn is_available(&self) -> bool {
        !self.unavailable
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("entries", &self.snapshot().len())
            .field("unavailable", &self.unavailable)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Storage
// ─────────────────────────────────────────────────────────────────────────────

/// On-disk document.
#[derive(Serialize, Deserialize)]
struct PreferenceFile {
    format_version: u32,
    entries: BTreeMap<String, Value>,
}

impl PreferenceFile {
    const FORMAT_VERSION: u32 = 1;
}

/// JSON file backend.
///
/// ```json
/// { "format_version": 1, "entries": { "music-enabled": true } }
/// ```
///
/// Saves write `{path}.tmp`, sync it, then rename over `{path}`, so a crash
/// never leaves a truncated file behind.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage at `path`. The file is created on first save.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `$XDG_STATE_HOME/keepsake/preferences.json`, falling back to
    /// `~/.local/state` and then the working directory.
    #[must_use]
    pub fn default_location() -> Self {
        Self::new(state_dir().join("keepsake").join("preferences.json"))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone();
        tmp.set_extension("json.tmp");
        tmp
    }
}

fn state_dir() -> PathBuf {
    if let Ok(state_home) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(state_home);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("state");
    }
    PathBuf::from(".")
}

impl StorageBackend for FileStorage {
    fn name(&self) -> &str {
        "FileStorage"
    }

    fn load_all(&self) -> StorageResult<BTreeMap<String, Value>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let file: PreferenceFile = serde_json::from_reader(reader)
            .map_err(|e| StorageError::Serialization(format!("failed to parse preferences: {e}")))?;
        if file.format_version != PreferenceFile::FORMAT_VERSION {
            keepsake_core::warn!(
                stored = file.format_version,
                expected = PreferenceFile::FORMAT_VERSION,
                "preference format mismatch, ignoring stored values"
            );
            return Ok(BTreeMap::new());
        }
        Ok(file.entries)
    }

    fn save_all(&self, entries: &BTreeMap<String, Value>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let document = PreferenceFile {
            format_version: PreferenceFile::FORMAT_VERSION,
            entries: entries.clone(),
        };
        let tmp_path = self.temp_path();
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer_pretty(&mut writer, &document).map_err(|e| {
                StorageError::Serialization(format!("failed to serialize preferences: {e}"))
            })?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        keepsake_core::debug!(path = %self.path.display(), entries = entries.len(), "saved preferences");
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        let Some(parent) = self.path.parent() else {
            return false;
        };
        if !parent.exists() {
            return fs::create_dir_all(parent).is_ok();
        }
        let probe = parent.join(".keepsake_probe");
        if fs::write(&probe, b"probe").is_ok() {
            let _ = fs::remove_file(&probe);
            return true;
        }
        false
    }
}

impl fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStorage")
            .field("path", &self.path)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Preference Store
// ─────────────────────────────────────────────────────────────────────────────

/// Cached preferences over a backend.
///
/// Reads hit the cache; writes mark the store dirty until [`flush`].
///
/// [`flush`]: PreferenceStore::flush
pub struct PreferenceStore {
    backend: Box<dyn StorageBackend>,
    cache: BTreeMap<String, Value>,
    dirty: bool,
}

impl PreferenceStore {
    /// Wrap `backend`. Call [`load`](Self::load) to read stored values.
    #[must_use]
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend,
            cache: BTreeMap::new(),
            dirty: false,
        }
    }

    /// A store that forgets everything on drop.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    /// Replace the cache with what the backend holds.
    ///
    /// Returns the number of entries loaded. An unavailable backend loads
    /// nothing and is not an error.
    pub fn load(&mut self) -> StorageResult<usize> {
        if !self.backend.is_available() {
            keepsake_core::warn!(backend = self.backend.name(), "preference storage unavailable");
            self.cache.clear();
            self.dirty = false;
            return Ok(0);
        }
        self.cache = self.backend.load_all()?;
        self.dirty = false;
        keepsake_core::debug!(backend = self.backend.name(), count = self.cache.len(), "loaded preferences");
        Ok(self.cache.len())
    }

    /// Write the cache if anything changed since the last load or flush.
    ///
    /// Returns `Ok(true)` if the backend was written.
    pub fn flush(&mut self) -> StorageResult<bool> {
        if !self.dirty || !self.backend.is_available() {
            return Ok(false);
        }
        self.backend.save_all(&self.cache)?;
        self.dirty = false;
        Ok(true)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.cache.get(key)
    }

    /// A stored boolean. Legacy string values `"true"`/`"false"` are
    /// accepted; anything else reads as absent.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.cache.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) if s == "true" => Some(true),
            Value::String(s) if s == "false" => Some(false),
            _ => None,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if self.cache.get(&key) != Some(&value) {
            self.cache.insert(key, value);
            self.dirty = true;
        }
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.set(key, Value::Bool(value));
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.cache.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Drop the cache and everything stored.
    pub fn clear(&mut self) -> StorageResult<()> {
        self.cache.clear();
        self.dirty = false;
        self.backend.clear()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

impl fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("backend", &self.backend.name())
            .field("entries", &self.cache.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        let mut entries = BTreeMap::new();
        entries.insert("music-enabled".to_string(), json!(true));
        storage.save_all(&entries).unwrap();
        assert_eq!(storage.load_all().unwrap(), entries);
        storage.clear().unwrap();
        assert!(storage.load_all().unwrap().is_empty());
    }

    #[test]
    fn store_tracks_dirty_state() {
        let backend = MemoryStorage::new();
        let mut store = PreferenceStore::new(Box::new(backend.clone()));
        assert_eq!(store.load().unwrap(), 0);
        assert!(!store.is_dirty());

        store.set_bool("music-enabled", false);
        assert!(store.is_dirty());
        assert!(backend.snapshot().is_empty());

        assert!(store.flush().unwrap());
        assert!(!store.is_dirty());
        assert_eq!(backend.snapshot().get("music-enabled"), Some(&json!(false)));
        assert!(!store.flush().unwrap());
    }

    #[test]
    fn setting_same_value_stays_clean() {
        let mut store = PreferenceStore::in_memory();
        store.set_bool("k", true);
        store.flush().unwrap();
        store.set_bool("k", true);
        assert!(!store.is_dirty());
    }

    #[test]
    fn legacy_string_booleans() {
        let mut entries = BTreeMap::new();
        entries.insert("a".to_string(), json!("true"));
        entries.insert("b".to_string(), json!("false"));
        entries.insert("c".to_string(), json!("maybe"));
        let mut store = PreferenceStore::new(Box::new(MemoryStorage::with_entries(entries)));
        store.load().unwrap();
        assert_eq!(store.get_bool("a"), Some(true));
        assert_eq!(store.get_bool("b"), Some(false));
        assert_eq!(store.get_bool("c"), None);
        assert_eq!(store.get_bool("missing"), None);
    }

    #[test]
    fn unavailable_backend_degrades_to_memory() {
        let mut store = PreferenceStore::new(Box::new(MemoryStorage::unavailable()));
        assert_eq!(store.load().unwrap(), 0);
        store.set_bool("music-enabled", true);
        assert_eq!(store.get_bool("music-enabled"), Some(true));
        assert!(!store.flush().unwrap());
    }

    #[test]
    fn remove_marks_dirty() {
        let mut store = PreferenceStore::in_memory();
        store.set_bool("k", true);
        store.flush().unwrap();
        assert_eq!(store.remove("k"), Some(json!(true)));
        assert!(store.is_dirty());
        assert_eq!(store.remove("k"), None);
    }

    #[test]
    fn storage_error_display() {
        let err = StorageError::Serialization("bad".into());
        assert_eq!(err.to_string(), "storage serialization error: bad");
        let err = StorageError::from(std::io::Error::other("disk"));
        assert!(err.to_string().contains("disk"));
    }
}
