//! Core types, configuration, and utilities for the signer-backed auth workspace.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{AuthEnvironment, Config, DEFAULT_LOG_LEVEL};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level, LogFileWriter};
pub use paths::Paths;
