// ═══════════════════════════════════════════════════════════════════════════
// Object storage: receipt images live outside the database, addressed by an
// opaque path. The trait seam exists so the pipeline can be tested without a
// filesystem and so a bucket-backed store can be swapped in later.
// ═══════════════════════════════════════════════════════════════════════════

pub mod fs;

pub use fs::FsObjectStore;

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to write object '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete object '{path}': {source}")]
    Delete {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid object path: {0}")]
    InvalidPath(String),
}

/// Backing store for uploaded receipt images.
pub trait ObjectStore: Send + Sync {
    /// Write `bytes` at `path`, creating parent prefixes as needed.
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Best-effort removal. Deleting a missing object is not an error.
    fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Public URL at which the object can be fetched.
    fn public_url(&self, path: &str) -> String;
}

/// In-memory store for testing. Records every put and delete so tests can
/// assert exactly which objects were touched.
pub struct MockObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    deletes: Mutex<Vec<String>>,
    fail_puts: bool,
    fail_deletes: bool,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            deletes: Mutex::new(Vec::new()),
            fail_puts: false,
            fail_deletes: false,
        }
    }

    /// A store whose every put fails.
    pub fn failing_puts() -> Self {
        Self {
            fail_puts: true,
            ..Self::new()
        }
    }

    /// A store that accepts puts but fails deletes.
    pub fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::new()
        }
    }

    pub fn stored_paths(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn deleted_paths(&self) -> Vec<String> {
        self.deletes.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects
            .lock()
            .map(|o| o.contains_key(path))
            .unwrap_or(false)
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for MockObjectStore {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_puts {
            return Err(StorageError::Write {
                path: path.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "mock put failure"),
            });
        }
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(path.to_string(), bytes.to_vec());
        }
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        if let Ok(mut deletes) = self.deletes.lock() {
            deletes.push(path.to_string());
        }
        if self.fail_deletes {
            return Err(StorageError::Delete {
                path: path.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "mock delete failure"),
            });
        }
        if let Ok(mut objects) = self.objects.lock() {
            objects.remove(path);
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("mock://store/{path}")
    }
}
