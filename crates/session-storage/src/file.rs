//! JSON file storage backend.
//!
//! Every key lives in one JSON object on disk. Writes go to a sibling temp
//! file that is then renamed over the original, so a crash mid-write leaves
//! the previous contents intact.

use crate::{SecureStorage, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File-backed key/value storage.
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStorage {
    /// Create a storage instance backed by `path`. The file is created lazily
    /// on the first write; the parent directory must be creatable.
    pub fn new(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> StorageResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                StorageError::Encoding(format!(
                    "Failed to parse {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, data: &BTreeMap<String, String>) -> StorageResult<()> {
        let content = serde_json::to_string_pretty(data)?;
        let tmp_path = self.path.with_extension("json.tmp");

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl SecureStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(path = %self.path.display(), key = %key, "Setting value");
        let _guard = self.lock.lock();
        let mut data = match self.read_all() {
            Ok(data) => data,
            Err(StorageError::Encoding(e)) => {
                warn!(error = %e, "Replacing unreadable storage file");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        data.insert(key.to_string(), value.to_string());
        self.write_all(&data)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(path = %self.path.display(), key = %key, "Deleting value");
        let _guard = self.lock.lock();
        let mut data = self.read_all()?;
        let existed = data.remove(key).is_some();
        if existed {
            self.write_all(&data)?;
        }
        Ok(existed)
    }
}
