//! Runtime configuration, loaded from JSON and the environment.

use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Points at a JSON config file.
pub const CONFIG_PATH_ENV: &str = "RECEPTION_CONFIG";
/// Overrides [`Config::admin_token`].
pub const ADMIN_TOKEN_ENV: &str = "RECEPTION_ADMIN_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Client-side configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backoff for building the backend client (default: 5 attempts)
    pub connection_retry: RetryConfig,

    /// Transport retries for the profile read (default: 3 attempts)
    pub profile_query_retry: RetryConfig,

    /// Transport retries for the my-application read (default: 2 attempts)
    pub application_query_retry: RetryConfig,

    /// Transport retries for the applicant search (default: 2 attempts)
    pub applicants_query_retry: RetryConfig,

    /// Secret passed to the access-control handshake
    pub admin_token: String,

    /// Where the signed-in identity is persisted. In memory when unset.
    pub session_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            connection_retry: RetryConfig::default(),
            profile_query_retry: RetryConfig::with_max_attempts(3),
            application_query_retry: RetryConfig::with_max_attempts(2),
            applicants_query_retry: RetryConfig::with_max_attempts(2),
            admin_token: String::new(),
            session_file: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::parse_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, or the file named by `RECEPTION_CONFIG`, with `RECEPTION_ADMIN_TOKEN` applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(
            std::env::var_os(CONFIG_PATH_ENV).as_deref().map(Path::new),
            std::env::var(ADMIN_TOKEN_ENV).ok(),
        )
    }

    /// Validated once, after the token override.
    fn load(path: Option<&Path>, admin_token: Option<String>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::parse_file(path)?,
            None => Config::default(),
        };
        if let Some(token) = admin_token {
            config.admin_token = token;
        }
        config.validate()?;
        Ok(config)
    }

    fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let policies = [
            ("connection_retry", &self.connection_retry),
            ("profile_query_retry", &self.profile_query_retry),
            ("application_query_retry", &self.application_query_retry),
            ("applicants_query_retry", &self.applicants_query_retry),
        ];
        for (name, retry) in policies {
            retry
                .validate()
                .map_err(|reason| ConfigError::Invalid(format!("{name}: {reason}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.connection_retry.max_attempts, 5);
        assert_eq!(config.profile_query_retry.max_attempts, 3);
        assert_eq!(config.application_query_retry.max_attempts, 2);
        assert_eq!(config.applicants_query_retry.max_attempts, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"admin_token": "s3cret", "connection_retry": {"max_attempts": 7}}"#,
        )
        .unwrap();
        assert_eq!(config.admin_token, "s3cret");
        assert_eq!(config.connection_retry.max_attempts, 7);
        assert_eq!(config.connection_retry.initial_delay_ms, 1000);
        assert_eq!(config.profile_query_retry.max_attempts, 3);
    }

    #[test]
    fn test_validate_names_the_bad_policy() {
        let mut config = Config::default();
        config.applicants_query_retry.max_attempts = 0;
        match config.validate() {
            Err(ConfigError::Invalid(reason)) => {
                assert!(reason.starts_with("applicants_query_retry"), "{reason}")
            }
            other => panic!("expected invalid config, got {other:?}"),
        }
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "reception-connect-config-{}.json",
            std::process::id()
        ));
        let mut config = Config::default();
        config.admin_token = "token".to_string();
        config.session_file = Some(PathBuf::from("/tmp/session.json"));

        config.to_file(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_applies_token_override_to_file() {
        let path = std::env::temp_dir().join(format!(
            "reception-connect-config-load-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"{"admin_token": "from-file", "profile_query_retry": {"max_attempts": 4}}"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), Some("from-env".to_string())).unwrap();
        assert_eq!(config.admin_token, "from-env");
        assert_eq!(config.profile_query_retry.max_attempts, 4);

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.admin_token, "from-file");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!(
            "reception-connect-config-invalid-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"connection_retry": {"max_attempts": 0}}"#).unwrap();

        let result = Config::load(Some(&path), Some("token".to_string()));
        assert!(matches!(result, Err(ConfigError::Invalid(reason)) if reason.starts_with("connection_retry")));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = Config::load(None, None).unwrap();
        assert_eq!(config, Config::default());
    }
}
