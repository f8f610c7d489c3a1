//! Durable client storage.
//!
//! [`KeyValueStore`] is the raw backend (one string value per key).
//! [`Storage`] is the handle the session and wizard stores use: it never
//! fails towards its caller and falls back to memory after the first
//! backend error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored value could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// String key-value backend.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// File backend
// ---------------------------------------------------------------------------

/// One file per key under a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never observes a half-written value.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) the store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Per-user data directory for this application, if the platform has
    /// one.
    pub fn default_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("cl", "pension", "pension-wizard")
            .map(|dirs| dirs.data_dir().to_path_buf())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Memory backend
// ---------------------------------------------------------------------------

/// In-process backend. Also used as the fallback once durable storage has
/// failed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose every operation fails, like storage disabled by
    /// the platform.
    pub fn unavailable() -> Self {
        let store = Self::default();
        store.set_unavailable(true);
        store
    }

    /// Switch failure mode on or off.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("storage disabled".into()));
        }
        // A poisoned map is still a consistent map of strings.
        Ok(self.entries.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Degrading handle
// ---------------------------------------------------------------------------

/// Shared storage handle.
///
/// All reads and writes go to the durable backend until it returns an
/// error. From then on the handle is degraded: a warning is logged once
/// and every later operation uses an in-memory map for the rest of the
/// process lifetime.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<StorageInner>,
}

struct StorageInner {
    backend: Arc<dyn KeyValueStore>,
    fallback: MemoryStore,
    degraded: AtomicBool,
}

impl Storage {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(StorageInner {
                backend,
                fallback: MemoryStore::new(),
                degraded: AtomicBool::new(false),
            }),
        }
    }

    /// Memory-only storage from the start.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Whether the durable backend has failed and memory is in use.
    pub fn is_degraded(&self) -> bool {
        self.inner.degraded.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if !self.is_degraded() {
            match self.inner.backend.get(key) {
                Ok(value) => return value,
                Err(e) => self.degrade("read", key, &e),
            }
        }
        self.inner.fallback.get(key).ok().flatten()
    }

    pub fn set(&self, key: &str, value: &str) {
        if !self.is_degraded() {
            match self.inner.backend.set(key, value) {
                Ok(()) => return,
                Err(e) => self.degrade("write", key, &e),
            }
        }
        let _ = self.inner.fallback.set(key, value);
    }

    pub fn remove(&self, key: &str) {
        if !self.is_degraded() {
            match self.inner.backend.remove(key) {
                Ok(()) => return,
                Err(e) => self.degrade("remove", key, &e),
            }
        }
        let _ = self.inner.fallback.remove(key);
    }

    fn degrade(&self, operation: &str, key: &str, error: &StorageError) {
        if !self.inner.degraded.swap(true, Ordering::SeqCst) {
            tracing::warn!(
                operation,
                key,
                error = %error,
                "Durable storage failed, keeping state in memory only",
            );
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("degraded", &self.is_degraded())
            .finish_non_exhaustive()
    }
}
