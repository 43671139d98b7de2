#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for remake
//!
//! This crate handles loading and merging configuration from:
//! - Configuration file (~/.remake.toml, written by the provisioning tool)
//! - Environment variables
//! - CLI flags
//!
//! The core never reads ambient state: the resolved `Config` value is passed
//! into the transport and request-building layers explicitly.

use remake_errors::{ConfigError, Error};
use remake_types::{Credentials, ServerEndpoint};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Hosting domain the server address is derived from when no explicit
/// server URL is configured
pub const DEFAULT_BUILD_DOMAIN: &str = "herokuapp.com";

/// Main configuration structure
///
/// All fields are optional: the file is written by the out-of-scope
/// provisioning tool and may not exist yet.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Application identifier the server address is derived from
    pub app: Option<String>,

    /// Explicit server host, overriding the derived `{app}` address
    pub host: Option<String>,

    /// Shared secret attached to every request
    pub secret: Option<String>,

    /// Full server URL override (normally supplied via MAKE_SERVER)
    #[serde(skip)]
    pub server_override: Option<String>,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let home = dirs::home_dir().ok_or_else(|| ConfigError::NotFound {
            path: "home directory".to_string(),
        })?;
        Ok(home.join(".remake.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            debug!("no config file at {}, using defaults", config_path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: &Option<PathBuf>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    pub fn merge_env(&mut self) {
        // MAKE_SERVER: full server URL, takes precedence over the derived address
        if let Ok(server) = std::env::var("MAKE_SERVER") {
            self.server_override = Some(server);
        }

        // REMAKE_SECRET
        if let Ok(secret) = std::env::var("REMAKE_SECRET") {
            self.secret = Some(secret);
        }
    }

    /// Resolve the server endpoint for this invocation
    ///
    /// Precedence: full URL override (CLI flag or MAKE_SERVER), then the
    /// address derived from the configured app identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the override URL is malformed, or if neither an
    /// override nor an app identifier is configured.
    pub fn endpoint(&self) -> Result<ServerEndpoint, Error> {
        if let Some(url) = &self.server_override {
            return ServerEndpoint::from_url(url);
        }

        let app = self.app.as_ref().ok_or_else(|| ConfigError::MissingField {
            field: "app".to_string(),
        })?;

        let host = self
            .host
            .clone()
            .unwrap_or_else(|| format!("{app}.{DEFAULT_BUILD_DOMAIN}"));
        Ok(ServerEndpoint::new(host, 80))
    }

    /// Resolve the shared secret for this invocation
    ///
    /// # Errors
    ///
    /// Returns an error if no secret is configured.
    pub fn credentials(&self) -> Result<Credentials, Error> {
        let secret = self
            .secret
            .as_ref()
            .ok_or_else(|| ConfigError::MissingField {
                field: "secret".to_string(),
            })?;
        Ok(Credentials::new(secret.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_from_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("remake.toml");
        tokio::fs::write(&path, "app = \"mybuilds\"\nsecret = \"s3cret\"\n")
            .await
            .unwrap();

        let config = Config::load_from_file(&path).await.unwrap();
        assert_eq!(config.app.as_deref(), Some("mybuilds"));
        assert_eq!(config.secret.as_deref(), Some("s3cret"));
        assert!(config.host.is_none());
    }

    #[tokio::test]
    async fn test_load_missing_file_errors() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("nope.toml");
        let err = Config::load_from_file(&missing).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn test_endpoint_derived_from_app() {
        let config = Config {
            app: Some("mybuilds".to_string()),
            ..Config::default()
        };
        let ep = config.endpoint().unwrap();
        assert_eq!(ep.host, "mybuilds.herokuapp.com");
        assert_eq!(ep.port, 80);
    }

    #[test]
    fn test_endpoint_override_wins() {
        let config = Config {
            app: Some("mybuilds".to_string()),
            server_override: Some("http://localhost:5000".to_string()),
            ..Config::default()
        };
        let ep = config.endpoint().unwrap();
        assert_eq!(ep.host, "localhost");
        assert_eq!(ep.port, 5000);
    }

    #[test]
    fn test_endpoint_without_app_fails() {
        let config = Config::default();
        let err = config.endpoint().unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingField { ref field }) if field == "app"
        ));
    }

    #[test]
    fn test_credentials_missing_secret() {
        let config = Config::default();
        assert!(config.credentials().is_err());

        let config = Config {
            secret: Some("s3cret".to_string()),
            ..Config::default()
        };
        assert_eq!(config.credentials().unwrap().secret, "s3cret");
    }
}
