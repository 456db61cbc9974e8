//! Storage key constants.

/// Storage keys used by the auth coordinator
pub struct StorageKeys;

impl StorageKeys {
    /// Persisted `AuthState` record (JSON)
    pub const AUTH_STATE: &'static str = "auth_state";
}
