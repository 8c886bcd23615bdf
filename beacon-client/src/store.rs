//! Local key-value storage.
//!
//! Values are plain strings keyed by name, like a browser's local storage. Beacon persists two
//! keys: [`ACCESS_TOKEN_KEY`] and [`RECORDING_ENABLED_KEY`].

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

/// Key of the access token configured by the operator.
pub const ACCESS_TOKEN_KEY: &str = "access-token";

/// Key of the session recording preference, stored as `"true"` or `"false"`.
pub const RECORDING_ENABLED_KEY: &str = "session-recording-enabled";

/// An error returned when writing to a [`LocalStore`] fails.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage file could not be read or written.
    #[error("could not access storage file {}", .path.display())]
    Io {
        /// Path to the storage file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The storage file does not contain a JSON object of strings.
    #[error("invalid storage file {}", .path.display())]
    Json {
        /// Path to the storage file.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// String-valued key-value storage that outlives a session.
pub trait LocalStore: fmt::Debug + Send + Sync {
    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes the value stored under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Returns the persisted session recording preference.
///
/// Anything other than the exact string `"true"` reads as disabled.
pub fn recording_enabled(store: &dyn LocalStore) -> bool {
    store.get(RECORDING_ENABLED_KEY).as_deref() == Some("true")
}

/// Persists the session recording preference.
pub fn set_recording_enabled(store: &dyn LocalStore, enabled: bool) -> Result<(), StoreError> {
    let value = if enabled { "true" } else { "false" };
    store.set(RECORDING_ENABLED_KEY, value)
}

/// A [`LocalStore`] that only lives in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// A [`LocalStore`] backed by a JSON file.
///
/// The file is read once when opening the store and rewritten on every change. A missing file is
/// treated as empty storage and created on the first write.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the storage file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let values = match fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Returns the path of the storage file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `f` to a copy of the values and writes it to disk before committing it in memory.
    fn update<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut values = self.values.lock();
        let mut updated = values.clone();
        f(&mut updated);

        if updated != *values {
            self.write(&updated)?;
            *values = updated;
        }

        Ok(())
    }

    fn write(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let data = serde_json::to_vec_pretty(values).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        // Write to a sibling file first so a crash never leaves a truncated store behind.
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data).map_err(io_error)?;
        fs::rename(&tmp_path, &self.path).map_err(io_error)?;

        Ok(())
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|values| {
            values.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|values| {
            values.remove(key);
        })
    }
}
