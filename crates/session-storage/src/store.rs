//! Copy-on-write owner of the current `AuthState`.

use crate::{AuthState, SecureStorage, StorageError, StorageKeys, StorageResult};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

/// Holds the current auth state and persists every replacement.
///
/// Readers get an `Arc` snapshot; writers replace the whole record. A reader
/// therefore never sees a profile from one session next to a token from
/// another.
pub struct SessionStore {
    storage: Box<dyn SecureStorage>,
    current: RwLock<Arc<AuthState>>,
}

impl SessionStore {
    /// Create a store that starts signed out without reading the backend.
    pub fn new(storage: Box<dyn SecureStorage>) -> Self {
        Self {
            storage,
            current: RwLock::new(Arc::new(AuthState::signed_out())),
        }
    }

    /// Create a store seeded from the record persisted in `storage`.
    ///
    /// A missing record yields the signed-out state. So does a record that
    /// cannot be decoded, or one claiming to be signed in without a session;
    /// the next `replace` overwrites it. Backend I/O failures are errors.
    pub fn load(storage: Box<dyn SecureStorage>) -> StorageResult<Self> {
        let state = match storage.get(StorageKeys::AUTH_STATE) {
            Ok(Some(raw)) => match serde_json::from_str::<AuthState>(&raw) {
                Ok(state) if state.is_consistent() => state,
                Ok(_) => {
                    warn!("Persisted auth state is signed in without a session, resetting");
                    AuthState::signed_out()
                }
                Err(e) => {
                    warn!(error = %e, "Persisted auth state is unreadable, resetting");
                    AuthState::signed_out()
                }
            },
            Ok(None) => AuthState::signed_out(),
            Err(StorageError::Encoding(e)) => {
                warn!(error = %e, "Auth state storage is unreadable, resetting");
                AuthState::signed_out()
            }
            Err(e) => return Err(e),
        };

        debug!(is_signed_in = state.is_signed_in(), "Loaded auth state");

        Ok(Self {
            storage,
            current: RwLock::new(Arc::new(state)),
        })
    }

    /// Current state snapshot.
    pub fn snapshot(&self) -> Arc<AuthState> {
        Arc::clone(&self.current.read())
    }

    /// Persist `next` and make it the current state.
    ///
    /// The backend write happens first; if it fails the in-memory state is
    /// left exactly as it was.
    pub fn replace(&self, next: AuthState) -> StorageResult<Arc<AuthState>> {
        let serialized = serde_json::to_string(&next)?;

        let mut current = self.current.write();
        self.storage.set(StorageKeys::AUTH_STATE, &serialized)?;
        let next = Arc::new(next);
        *current = Arc::clone(&next);

        debug!(is_signed_in = next.is_signed_in(), "Auth state replaced");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileStorage, MemoryStorage, SessionData, SessionProfile};

    fn sample_session(token: &str) -> SessionData {
        SessionData {
            profile: SessionProfile {
                identifier_id: "identifier".to_string(),
                profile_id: "profile".to_string(),
                metametrics_id: "metametrics".to_string(),
            },
            access_token: token.to_string(),
            expires_in: "2026-01-01T00:30:00.000Z".to_string(),
        }
    }

    /// Backend whose writes always fail.
    struct FailingStorage;

    impl SecureStorage for FailingStorage {
        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Platform("disk full".to_string()))
        }

        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Ok(None)
        }

        fn delete(&self, _key: &str) -> StorageResult<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_new_store_is_signed_out() {
        let store = SessionStore::new(Box::new(MemoryStorage::new()));
        assert!(!store.snapshot().is_signed_in());
    }

    #[test]
    fn test_replace_swaps_snapshot_and_persists() {
        let storage = MemoryStorage::new();
        let store = SessionStore::new(Box::new(storage));

        let before = store.snapshot();
        store
            .replace(AuthState::signed_in(sample_session("token-1")))
            .unwrap();

        // Old snapshot is untouched
        assert!(!before.is_signed_in());
        let after = store.snapshot();
        assert_eq!(after.session().unwrap().access_token, "token-1");

        let raw = store.storage.get(StorageKeys::AUTH_STATE).unwrap().unwrap();
        assert!(raw.contains("\"accessToken\":\"token-1\""));
    }

    #[test]
    fn test_load_restores_persisted_state() {
        let storage = MemoryStorage::new();
        let state = AuthState::signed_in(sample_session("token-2"));
        storage
            .set(StorageKeys::AUTH_STATE, &serde_json::to_string(&state).unwrap())
            .unwrap();

        let store = SessionStore::load(Box::new(storage)).unwrap();
        assert_eq!(*store.snapshot(), state);
    }

    #[test]
    fn test_load_missing_record_is_signed_out() {
        let store = SessionStore::load(Box::new(MemoryStorage::new())).unwrap();
        assert_eq!(*store.snapshot(), AuthState::signed_out());
    }

    #[test]
    fn test_load_inconsistent_record_resets() {
        let storage = MemoryStorage::new();
        storage
            .set(StorageKeys::AUTH_STATE, r#"{"isSignedIn":true}"#)
            .unwrap();

        let store = SessionStore::load(Box::new(storage)).unwrap();
        assert!(!store.snapshot().is_signed_in());
    }

    #[test]
    fn test_load_corrupt_record_resets() {
        let storage = MemoryStorage::new();
        storage.set(StorageKeys::AUTH_STATE, "{{nope").unwrap();

        let store = SessionStore::load(Box::new(storage)).unwrap();
        assert_eq!(*store.snapshot(), AuthState::signed_out());
    }

    #[test]
    fn test_corrupt_session_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let store = SessionStore::load(Box::new(FileStorage::new(&path).unwrap())).unwrap();
        assert!(!store.snapshot().is_signed_in());

        store
            .replace(AuthState::signed_in(sample_session("token-4")))
            .unwrap();

        let reloaded = SessionStore::load(Box::new(FileStorage::new(&path).unwrap())).unwrap();
        assert_eq!(
            reloaded.snapshot().session().unwrap().access_token,
            "token-4"
        );
    }

    #[test]
    fn test_load_propagates_backend_failure() {
        struct BrokenStorage;

        impl SecureStorage for BrokenStorage {
            fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
                Ok(())
            }

            fn get(&self, _key: &str) -> StorageResult<Option<String>> {
                Err(StorageError::Platform("keychain locked".to_string()))
            }

            fn delete(&self, _key: &str) -> StorageResult<bool> {
                Ok(false)
            }
        }

        let result = SessionStore::load(Box::new(BrokenStorage));
        assert!(matches!(result, Err(StorageError::Platform(_))));
    }

    #[test]
    fn test_failed_persist_leaves_state_unchanged() {
        let store = SessionStore::new(Box::new(FailingStorage));

        let result = store.replace(AuthState::signed_in(sample_session("token-3")));
        assert!(result.is_err());
        assert_eq!(*store.snapshot(), AuthState::signed_out());
    }
}
