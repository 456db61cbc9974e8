//! Authentication error types.

use thiserror::Error;

/// Namespace tag carried by every sign-in failure message.
pub const SIGN_IN_ERROR_PREFIX: &str = "AuthenticationController";

/// Why a handshake did not produce a session.
///
/// Cloneable so that every caller awaiting a shared handshake receives the
/// same outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// Nonce endpoint returned nothing usable
    #[error("Unable to get nonce")]
    NonceUnavailable,

    /// Login endpoint returned nothing usable, or no token
    #[error("Unable to login")]
    LoginRejected,

    /// Token endpoint returned nothing usable
    #[error("Unable to get Access Token")]
    AccessTokenUnavailable,

    /// Failure raised by the signer, transport, or persistence layer
    #[error("{0}")]
    Unexpected(String),
}

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Operation requires a signed-in session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The sign-in handshake failed; nothing was committed
    #[error("{}: Failed to authenticate - {}", SIGN_IN_ERROR_PREFIX, .0)]
    SignIn(#[from] HandshakeError),

    /// Signer capability rejected a request
    #[error("Signer error: {0}")]
    Signer(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] session_storage::StorageError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<auth_config_and_utils::CoreError> for AuthError {
    fn from(err: auth_config_and_utils::CoreError) -> Self {
        AuthError::Config(err.to_string())
    }
}

impl AuthError {
    /// Returns true if the caller must sign in before retrying.
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, AuthError::NotAuthenticated)
    }

    /// The handshake failure behind this error, if it is one.
    pub fn handshake_error(&self) -> Option<&HandshakeError> {
        match self {
            AuthError::SignIn(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_messages() {
        assert_eq!(HandshakeError::NonceUnavailable.to_string(), "Unable to get nonce");
        assert_eq!(HandshakeError::LoginRejected.to_string(), "Unable to login");
        assert_eq!(
            HandshakeError::AccessTokenUnavailable.to_string(),
            "Unable to get Access Token"
        );
    }

    #[test]
    fn test_sign_in_error_is_prefixed() {
        let err = AuthError::from(HandshakeError::NonceUnavailable);
        assert_eq!(
            err.to_string(),
            "AuthenticationController: Failed to authenticate - Unable to get nonce"
        );
    }

    #[test]
    fn test_unexpected_keeps_original_message() {
        let err = AuthError::from(HandshakeError::Unexpected("Signer error: locked".to_string()));
        assert!(err.to_string().ends_with("Failed to authenticate - Signer error: locked"));
        assert_eq!(
            err.handshake_error(),
            Some(&HandshakeError::Unexpected("Signer error: locked".to_string()))
        );
    }

    #[test]
    fn test_is_not_authenticated() {
        assert!(AuthError::NotAuthenticated.is_not_authenticated());
        assert!(!AuthError::from(HandshakeError::LoginRejected).is_not_authenticated());
    }
}
