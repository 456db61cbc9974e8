//! Canonical login message signed by the external signer.

use std::fmt;

/// Prefix every message handed to the signer must carry.
pub const LOGIN_MESSAGE_PREFIX: &str = "metamask:";

/// A string known to start with [`LOGIN_MESSAGE_PREFIX`].
///
/// The signer only accepts this type, so an unprefixed message cannot reach
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRawMessage(String);

impl LoginRawMessage {
    /// Wrap `raw` if it carries the required prefix.
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        raw.starts_with(LOGIN_MESSAGE_PREFIX).then_some(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoginRawMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build `metamask:{nonce}:{public_key}`.
///
/// Signer and service must agree on this string bit for bit; changing the
/// format breaks the protocol.
pub fn create_login_raw_message(nonce: &str, public_key: &str) -> LoginRawMessage {
    LoginRawMessage(format!("{LOGIN_MESSAGE_PREFIX}{nonce}:{public_key}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_login_raw_message() {
        let message = create_login_raw_message("N1", "PK1");
        assert_eq!(message.as_str(), "metamask:N1:PK1");
        assert_eq!(message.to_string(), "metamask:N1:PK1");
    }

    #[test]
    fn test_create_login_raw_message_is_stable() {
        let first = create_login_raw_message("N1", "PK1");
        let second = create_login_raw_message("N1", "PK1");
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_requires_prefix() {
        assert!(LoginRawMessage::parse("metamask:abc").is_some());
        assert!(LoginRawMessage::parse("metamask").is_none());
        assert!(LoginRawMessage::parse("other:abc").is_none());
    }
}
