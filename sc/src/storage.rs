//! Local key-value persistence for cart snapshots
//!
//! Mirrors the browser's localStorage: string keys, string values, read once at
//! startup and rewritten on every committed mutation.
//!
//! # Layout
//!
//! ```text
//! {storage.path}/
//! ├── .lock                       # fs2 exclusive lock, held while a FileStorage is open
//! └── %40RocketShoes%3Acart.json
//! ```
//!
//! Holding the lock for the lifetime of a `FileStorage` makes load, modify and
//! write a single critical section across processes: a second `sc` run waits in
//! `open` until the first one has dropped its storage.

use fs2::FileExt;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to lock storage directory: {0}")]
    Lock(#[source] io::Error),

    #[error("Storage directory {} is in use by another process", .0.display())]
    Busy(PathBuf),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Synchronous key-value store
///
/// Values are written as strings and read back as raw bytes; decoding is the
/// caller's concern so that corrupt content is told apart from I/O failure.
pub trait CartStorage: Send + Sync {
    /// Bytes stored under `key`, None if never written
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the value stored under `key`
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Directory-backed storage, one file per key
pub struct FileStorage {
    base_path: PathBuf,
    // Released when the storage is dropped
    _lock: fs::File,
}

impl FileStorage {
    /// Open or create storage at the given directory, waiting for other holders
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let base_path = path.as_ref().to_path_buf();
        let lock = open_lock_file(&base_path)?;
        lock.lock_exclusive().map_err(StorageError::Lock)?;
        debug!(?base_path, "Opened cart storage");
        Ok(Self { base_path, _lock: lock })
    }

    /// Like `open`, but fail with `Busy` instead of waiting
    pub fn try_open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let base_path = path.as_ref().to_path_buf();
        let lock = open_lock_file(&base_path)?;
        if let Err(e) = lock.try_lock_exclusive() {
            debug!(?base_path, error = %e, "try_open: lock held elsewhere");
            return Err(StorageError::Busy(base_path));
        }
        debug!(?base_path, "Opened cart storage");
        Ok(Self { base_path, _lock: lock })
    }

    /// File holding the value for `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.base_path.join(key_file_name(key))
    }
}

fn open_lock_file(base_path: &Path) -> Result<fs::File, StorageError> {
    fs::create_dir_all(base_path).map_err(|e| StorageError::io(base_path, e))?;
    let lock_path = base_path.join(".lock");
    fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| StorageError::io(&lock_path, e))
}

/// File name for a key: `[A-Za-z0-9.-]` kept, every other byte as `%XX`
///
/// The encoding is reversible, so distinct keys never share a file.
pub fn key_file_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 5);
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.' {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("%{:02X}", byte));
        }
    }
    name.push_str(".json");
    name
}

impl CartStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key);
        debug!(%key, path = %path.display(), "FileStorage::get: called");
        match fs::read(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        debug!(%key, path = %path.display(), len = value.len(), "FileStorage::set: called");

        let tmp_path = path.with_extension("json.tmp");
        let mut tmp = fs::File::create(&tmp_path).map_err(|e| StorageError::io(&tmp_path, e))?;
        tmp.write_all(value.as_bytes())
            .and_then(|_| tmp.sync_all())
            .map_err(|e| StorageError::io(&tmp_path, e))?;
        drop(tmp);
        fs::rename(&tmp_path, &path).map_err(|e| StorageError::io(&path, e))?;
        Ok(())
    }
}

/// In-process storage, shared between clones
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<AtomicUsize>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with one entry
    pub fn with_entry(key: &str, value: &str) -> Self {
        let storage = Self::new();
        if let Ok(mut entries) = storage.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        storage
    }

    /// Number of successful `set` calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make subsequent reads fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl CartStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("reads disabled".to_string()));
        }
        let entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(entries.get(key).map(|value| value.clone().into_bytes()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".to_string()));
        }
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
