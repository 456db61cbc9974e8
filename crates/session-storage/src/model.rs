//! Persisted authentication state.
//!
//! Field names serialize in camelCase to keep the persisted record
//! compatible with existing stored state.

use serde::{Deserialize, Serialize};

/// Anonymous identity record returned by the login step.
///
/// Replaced wholesale on re-authentication, never patched field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProfile {
    /// Deterministic id derived from the signing public key.
    pub identifier_id: String,
    /// Opaque profile identifier assigned by the service.
    pub profile_id: String,
    /// Opaque anonymous analytics id.
    pub metametrics_id: String,
}

/// Cached result of one successful handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub profile: SessionProfile,
    /// Opaque bearer credential.
    pub access_token: String,
    /// RFC 3339 timestamp. Despite the name this is an absolute instant,
    /// not a duration.
    pub expires_in: String,
}

/// Persisted root of the auth subsystem.
///
/// Only two shapes can be built: signed out with no session, or signed in
/// with a session. Replacing the whole value is the only way to change it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    is_signed_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_data: Option<SessionData>,
}

impl AuthState {
    /// Initial state: signed out, no session.
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Signed-in state carrying the session from one handshake.
    pub fn signed_in(session: SessionData) -> Self {
        Self {
            is_signed_in: true,
            session_data: Some(session),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.is_signed_in
    }

    /// The cached session, if any.
    pub fn session(&self) -> Option<&SessionData> {
        self.session_data.as_ref()
    }

    /// Whether a deserialized record satisfies "signed in implies session".
    pub(crate) fn is_consistent(&self) -> bool {
        !self.is_signed_in || self.session_data.is_some()
    }
}
