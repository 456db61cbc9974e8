//! Backend abstraction for the persisted auth record.

use crate::StorageResult;

/// Key/value backend that `SessionStore` persists through.
///
/// Values are JSON documents. Implementations must make `set` durable before
/// returning, since the store only swaps its in-memory snapshot afterwards.
pub trait SecureStorage: Send + Sync {
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Remove `key`. Returns whether a value was present.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
