use std::path::{Component, Path, PathBuf};

use super::{ObjectStore, StorageError};

/// Local-filesystem object store.
///
/// Objects live under `root`; `public_url` joins the configured base URL with
/// the object path, so a static file server pointed at `root` serves them
/// directly.
pub struct FsObjectStore {
    root: PathBuf,
    base_url: String,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object path under the root, rejecting anything that could
    /// escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let target = self.resolve(path)?;

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Write {
                path: path.to_string(),
                source: e,
            })?;
        }

        std::fs::write(&target, bytes).map_err(|e| StorageError::Write {
            path: path.to_string(),
            source: e,
        })?;

        tracing::debug!(path = %path, bytes = bytes.len(), "Stored object");
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;

        match std::fs::remove_file(&target) {
            Ok(()) => Ok(()),
            // Already gone counts as deleted
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Delete {
                path: path.to_string(),
                source: e,
            }),
        }
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}
