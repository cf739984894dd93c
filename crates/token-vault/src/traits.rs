//! Storage trait definitions.

use crate::StorageResult;

/// Trait for key/value storage backends.
pub trait KeyValueStorage: Send + Sync {
    /// Store a value
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Retrieve a value
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Delete a value, returning whether it existed
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Apply a batch of writes followed by deletions.
    ///
    /// The default applies each entry in turn. Backends that can commit the
    /// whole batch in one write override this.
    fn apply(&self, writes: &[(&str, &str)], deletes: &[&str]) -> StorageResult<()> {
        for (key, value) in writes {
            self.set(key, value)?;
        }
        for key in deletes {
            self.delete(key)?;
        }
        Ok(())
    }
}
