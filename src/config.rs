//! Runtime configuration, read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::models::UserContext;
use crate::session::SessionOptions;

const DEFAULT_CACHE_DIR: &str = ".listing-cache";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 40;
const DEFAULT_CREDENTIAL_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub cache_dir: PathBuf,
    pub request_timeout: Duration,
    pub credential_timeout: Duration,
    pub access_token: Option<String>,
    pub email_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let config = Self {
            api_base_url: get("LISTING_API_URL").ok_or(ConfigError::Missing("LISTING_API_URL"))?,
            cache_dir: get("LISTING_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
            request_timeout: seconds(
                "LISTING_REQUEST_TIMEOUT_SECS",
                get("LISTING_REQUEST_TIMEOUT_SECS"),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            credential_timeout: seconds(
                "LISTING_CREDENTIAL_TIMEOUT_SECS",
                get("LISTING_CREDENTIAL_TIMEOUT_SECS"),
                DEFAULT_CREDENTIAL_TIMEOUT_SECS,
            )?,
            access_token: get("LISTING_ACCESS_TOKEN"),
            email_id: get("LISTING_EMAIL_ID"),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "LISTING_API_URL",
                reason: "must be an http(s) URL".to_string(),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "LISTING_REQUEST_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.credential_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "LISTING_CREDENTIAL_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            request_timeout: self.request_timeout,
            credential_timeout: self.credential_timeout,
        }
    }

    /// Credential supplied up front, when both halves are configured
    pub fn credential(&self) -> Option<UserContext> {
        match (&self.email_id, &self.access_token) {
            (Some(email), Some(token)) => Some(UserContext::new(email.clone(), token.clone())),
            _ => None,
        }
    }
}

fn seconds(field: &'static str, raw: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    match raw {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidValue {
                field,
                reason: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("LISTING_API_URL", "https://api.example.com")]).unwrap();
        assert_eq!(config.cache_dir, PathBuf::from(DEFAULT_CACHE_DIR));
        assert_eq!(config.request_timeout, Duration::from_secs(40));
        assert_eq!(config.credential_timeout, Duration::from_secs(10));
        assert!(config.credential().is_none());
    }

    #[test]
    fn api_url_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("LISTING_API_URL"))));
        assert!(matches!(
            load(&[("LISTING_API_URL", "ftp://nope")]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn zero_or_garbage_timeouts_are_rejected() {
        assert!(load(&[
            ("LISTING_API_URL", "https://api.example.com"),
            ("LISTING_REQUEST_TIMEOUT_SECS", "0"),
        ])
        .is_err());
        assert!(load(&[
            ("LISTING_API_URL", "https://api.example.com"),
            ("LISTING_CREDENTIAL_TIMEOUT_SECS", "soon"),
        ])
        .is_err());
    }

    #[test]
    fn credential_needs_both_parts() {
        let config = load(&[
            ("LISTING_API_URL", "https://api.example.com"),
            ("LISTING_EMAIL_ID", "owner@example.com"),
            ("LISTING_ACCESS_TOKEN", "abc"),
        ])
        .unwrap();
        assert_eq!(
            config.credential(),
            Some(UserContext::new("owner@example.com", "abc"))
        );
    }
}
