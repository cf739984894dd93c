//! JSON file storage backend.
//!
//! All keys live in one JSON object. Writes go to a uniquely named sibling
//! temp file which is then renamed over the original, so a crash never leaves a half-written
//! store behind.

use crate::{KeyValueStorage, StorageError, StorageResult};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Key/value storage persisted to a single JSON file.
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStorage {
    /// Create a storage backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Token file is not valid JSON");
            StorageError::Json(e)
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        // Uniquely named per writer, so concurrent processes never share it.
        let mut tmp = NamedTempFile::new_in(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        tmp.write_all(&serde_json::to_vec_pretty(entries)?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!(path = %self.path.display(), keys = entries.len(), "Persisted token file");
        Ok(())
    }

    fn update<F>(&self, f: F) -> StorageResult<bool>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.load()?;
        let changed = f(&mut entries);
        if changed {
            self.persist(&entries)?;
        }
        Ok(changed)
    }
}

impl KeyValueStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        })?;
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.load()?.remove(key))
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        self.update(|entries| entries.remove(key).is_some())
    }

    fn apply(&self, writes: &[(&str, &str)], deletes: &[&str]) -> StorageResult<()> {
        self.update(|entries| {
            let mut changed = false;
            for (key, value) in writes {
                changed |= entries.insert(key.to_string(), value.to_string()).as_deref() != Some(*value);
            }
            for key in deletes {
                changed |= entries.remove(*key).is_some();
            }
            changed
        })?;
        Ok(())
    }
}
