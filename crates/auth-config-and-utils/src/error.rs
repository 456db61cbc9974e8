//! Errors raised while resolving configuration and runtime paths.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// A setting the requested operation depends on was never provided
    #[error("Missing configuration setting: {0}")]
    MissingSetting(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A configured base URL or endpoint does not parse
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Config file is not valid JSON for [`crate::Config`]
    #[error("Malformed config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not determine home directory")]
    HomeDirUnavailable,
}

/// Result type alias using CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
