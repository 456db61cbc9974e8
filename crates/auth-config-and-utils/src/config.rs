//! Configuration management for the auth coordinator.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const ENV_LOG_LEVEL: &str = "SIGNER_AUTH_LOG_LEVEL";
const ENV_ENVIRONMENT: &str = "SIGNER_AUTH_ENV";
const ENV_AUTH_URL: &str = "SIGNER_AUTH_AUTH_URL";
const ENV_OIDC_URL: &str = "SIGNER_AUTH_OIDC_URL";
const ENV_CLIENT_ID: &str = "SIGNER_AUTH_CLIENT_ID";
const ENV_SIGNER_URL: &str = "SIGNER_AUTH_SIGNER_URL";

/// Deployment environment of the authorization service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthEnvironment {
    Dev,
    Uat,
    #[default]
    Prd,
}

impl AuthEnvironment {
    /// Parse an environment name (`dev`, `uat`, `prd`/`prod`/`production`).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Some(Self::Dev),
            "uat" => Some(Self::Uat),
            "prd" | "prod" | "production" => Some(Self::Prd),
            _ => None,
        }
    }

    fn host_suffix(self) -> &'static str {
        match self {
            Self::Dev => "dev-api",
            Self::Uat => "uat-api",
            Self::Prd => "api",
        }
    }

    /// Base URL of the authentication service (nonce + login endpoints).
    pub fn auth_base_url(self) -> String {
        format!("https://authentication.{}.cx.metamask.io", self.host_suffix())
    }

    /// Base URL of the OIDC service (token endpoint).
    pub fn oidc_base_url(self) -> String {
        format!("https://oidc.{}.cx.metamask.io", self.host_suffix())
    }
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Which deployment of the authorization service to talk to.
    #[serde(default)]
    pub environment: AuthEnvironment,
    /// Override for the authentication service base URL.
    #[serde(default)]
    pub auth_base_url: Option<String>,
    /// Override for the OIDC service base URL.
    #[serde(default)]
    pub oidc_base_url: Option<String>,
    /// OAuth client id sent with the token exchange.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Endpoint of the signer capability dispatcher.
    #[serde(default)]
    pub signer_url: Option<String>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            environment: AuthEnvironment::default(),
            auth_base_url: None,
            oidc_base_url: None,
            client_id: None,
            signer_url: None,
        }
    }
}

impl Config {
    /// Load configuration from the config file (if present), then apply
    /// environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).and_then(non_empty);

        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(raw) = lookup(ENV_ENVIRONMENT) {
            match AuthEnvironment::parse(&raw) {
                Some(environment) => self.environment = environment,
                None => tracing::warn!(value = %raw, "Ignoring unknown auth environment"),
            }
        }
        if let Some(url) = lookup(ENV_AUTH_URL) {
            self.auth_base_url = Some(url);
        }
        if let Some(url) = lookup(ENV_OIDC_URL) {
            self.oidc_base_url = Some(url);
        }
        if let Some(client_id) = lookup(ENV_CLIENT_ID) {
            self.client_id = Some(client_id);
        }
        if let Some(url) = lookup(ENV_SIGNER_URL) {
            self.signer_url = Some(url);
        }
    }

    /// Authentication service base URL, honoring an explicit override.
    pub fn auth_base_url(&self) -> CoreResult<Url> {
        let raw = self
            .auth_base_url
            .clone()
            .unwrap_or_else(|| self.environment.auth_base_url());
        Url::parse(&raw).map_err(CoreError::from)
    }

    /// OIDC service base URL, honoring an explicit override.
    pub fn oidc_base_url(&self) -> CoreResult<Url> {
        let raw = self
            .oidc_base_url
            .clone()
            .unwrap_or_else(|| self.environment.oidc_base_url());
        Url::parse(&raw).map_err(CoreError::from)
    }

    /// OAuth client id; the token exchange cannot run without one.
    pub fn client_id(&self) -> CoreResult<&str> {
        self.client_id
            .as_deref()
            .ok_or(CoreError::MissingSetting("client_id"))
    }

    /// Signer dispatcher endpoint.
    pub fn signer_url(&self) -> CoreResult<Url> {
        let raw = self
            .signer_url
            .as_deref()
            .ok_or(CoreError::MissingSetting("signer_url"))?;
        Url::parse(raw).map_err(CoreError::from)
    }
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.environment, AuthEnvironment::Prd);
        assert!(config.client_id.is_none());
        assert!(config.signer_url.is_none());
    }

    #[test]
    fn test_environment_urls() {
        assert_eq!(
            AuthEnvironment::Prd.auth_base_url(),
            "https://authentication.api.cx.metamask.io"
        );
        assert_eq!(
            AuthEnvironment::Uat.oidc_base_url(),
            "https://oidc.uat-api.cx.metamask.io"
        );
        assert_eq!(
            AuthEnvironment::Dev.auth_base_url(),
            "https://authentication.dev-api.cx.metamask.io"
        );
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(AuthEnvironment::parse("DEV"), Some(AuthEnvironment::Dev));
        assert_eq!(AuthEnvironment::parse("production"), Some(AuthEnvironment::Prd));
        assert_eq!(AuthEnvironment::parse("staging"), None);
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        let config_json = r#"{
            "log_level": "debug",
            "environment": "uat",
            "client_id": "client-123"
        }"#;
        std::fs::write(&config_path, config_json).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.environment, AuthEnvironment::Uat);
        assert_eq!(config.client_id().unwrap(), "client-123");
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let mut config = Config::default();
        config.signer_url = Some("http://127.0.0.1:8545/rpc".to_string());
        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded.signer_url, config.signer_url);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_LOG_LEVEL, "trace"),
            (ENV_ENVIRONMENT, "dev"),
            (ENV_AUTH_URL, "http://localhost:4000"),
            (ENV_CLIENT_ID, "  "),
        ]);

        let mut config = Config::default();
        config.client_id = Some("from-file".to_string());
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.log_level, "trace");
        assert_eq!(config.environment, AuthEnvironment::Dev);
        assert_eq!(config.auth_base_url().unwrap().as_str(), "http://localhost:4000/");
        // Blank values never clobber configured ones
        assert_eq!(config.client_id().unwrap(), "from-file");
        assert_eq!(
            config.oidc_base_url().unwrap().as_str(),
            "https://oidc.dev-api.cx.metamask.io/"
        );
    }

    #[test]
    fn test_missing_client_id_is_config_error() {
        let config = Config::default();
        assert!(matches!(config.client_id(), Err(CoreError::MissingSetting(_))));
        assert!(matches!(config.signer_url(), Err(CoreError::MissingSetting(_))));
    }

    #[test]
    fn test_invalid_url_override() {
        let mut config = Config::default();
        config.auth_base_url = Some("not a valid url".to_string());
        assert!(config.auth_base_url().is_err());
    }
}
