//! File system paths for persisted auth state, config, and logs.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Directory name created under the user's home directory.
const BASE_DIR_NAME: &str = ".signer-auth";
/// File backing the secure key/value store.
const SESSION_FILE_NAME: &str = "session.json";
/// JSONL log file inside the logs directory.
const LOG_FILE_NAME: &str = "signer-auth.jsonl";

/// Manages file system paths for the CLI and persisted session.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for runtime files (~/.signer-auth)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.signer-auth`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir().ok_or(CoreError::HomeDirUnavailable)?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.signer-auth).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.signer-auth/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the session storage file path (~/.signer-auth/session.json).
    pub fn session_file(&self) -> PathBuf {
        self.base_dir.join(SESSION_FILE_NAME)
    }

    /// Get the logs directory (~/.signer-auth/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the JSONL log file path (~/.signer-auth/logs/signer-auth.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join(LOG_FILE_NAME)
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
