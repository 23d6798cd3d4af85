//! Client configuration.
//!
//! Values come from `VETDESK_*` environment variables or a JSON document.
//! Unset values fall back to defaults; malformed values are errors.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::api::AuthFailurePolicy;
use crate::db::{Database, DbError};
use crate::session::{MemoryStore, SessionHolder};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_PAGE_SIZE: usize = 6;
pub const DEFAULT_UPCOMING_LIMIT: usize = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not open session storage: {0}")]
    Storage(#[from] DbError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API base URL, without the trailing resource path
    pub api_url: String,
    /// Rows per page in client-side pagination
    pub page_size: usize,
    /// Rows in the dashboard's upcoming-appointments widget
    pub upcoming_limit: usize,
    pub on_auth_failure: AuthFailurePolicy,
    pub request_timeout_secs: u64,
    /// SQLite file for the persisted session; in-memory when unset
    pub storage_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            upcoming_limit: DEFAULT_UPCOMING_LIMIT,
            on_auth_failure: AuthFailurePolicy::KeepSession,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            storage_path: None,
        }
    }
}

impl ClientConfig {
    /// Load from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using `lookup` to read variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let defaults = Self::default();
        let config = Self {
            api_url: load(&lookup, "VETDESK_API_URL", defaults.api_url)?,
            page_size: load(&lookup, "VETDESK_PAGE_SIZE", defaults.page_size)?,
            upcoming_limit: load(&lookup, "VETDESK_UPCOMING_LIMIT", defaults.upcoming_limit)?,
            on_auth_failure: match lookup("VETDESK_ON_AUTH_FAILURE") {
                None => {
                    info!("VETDESK_ON_AUTH_FAILURE not set, using default: keep");
                    defaults.on_auth_failure
                }
                Some(raw) => parse_policy(&raw)?,
            },
            request_timeout_secs: load(
                &lookup,
                "VETDESK_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            storage_path: lookup("VETDESK_STORAGE_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        };
        if config.storage_path.is_none() {
            info!("VETDESK_STORAGE_PATH not set, session will not persist");
        }
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON document; missing keys take defaults.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Session holder over the configured storage.
    pub fn open_session(&self) -> ConfigResult<SessionHolder> {
        Ok(match &self.storage_path {
            Some(path) => SessionHolder::new(Database::open(path)?),
            None => SessionHolder::new(MemoryStore::new()),
        })
    }

    fn validate(&self) -> ConfigResult<()> {
        let url = self.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "api_url",
                message: format!("'{}' is not an http(s) URL", self.api_url),
            });
        }
        for (key, value) in [
            ("page_size", self.page_size as u64),
            ("upcoming_limit", self.upcoming_limit as u64),
            ("request_timeout_secs", self.request_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    message: "must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> ConfigResult<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                message: e.to_string(),
            }
        }),
    }
}

fn parse_policy(raw: &str) -> ConfigResult<AuthFailurePolicy> {
    match raw.trim().to_lowercase().as_str() {
        "keep" | "keep_session" => Ok(AuthFailurePolicy::KeepSession),
        "logout" | "clear_session" => Ok(AuthFailurePolicy::ClearSession),
        other => {
            warn!("Invalid VETDESK_ON_AUTH_FAILURE value: {other}");
            Err(ConfigError::Invalid {
                key: "VETDESK_ON_AUTH_FAILURE",
                message: format!("expected 'keep' or 'logout', got '{}'", other),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.page_size, 6);
        assert_eq!(config.on_auth_failure, AuthFailurePolicy::KeepSession);
    }

    #[test]
    fn test_env_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("VETDESK_API_URL", "https://clinic.example/api"),
            ("VETDESK_PAGE_SIZE", "10"),
            ("VETDESK_ON_AUTH_FAILURE", "logout"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://clinic.example/api");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.on_auth_failure, AuthFailurePolicy::ClearSession);
    }

    #[test]
    fn test_invalid_values() {
        assert!(ClientConfig::from_lookup(lookup(&[("VETDESK_PAGE_SIZE", "six")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("VETDESK_PAGE_SIZE", "0")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("VETDESK_ON_AUTH_FAILURE", "maybe")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("VETDESK_API_URL", "ftp://x")])).is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let config = ClientConfig::from_json(r#"{"upcoming_limit": 3}"#).unwrap();
        assert_eq!(config.upcoming_limit, 3);
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_open_session_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            storage_path: Some(dir.path().join("session.db")),
            ..ClientConfig::default()
        };
        let holder = config.open_session().unwrap();
        assert!(!holder.is_authenticated());
    }
}
