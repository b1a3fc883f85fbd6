//! Client configuration.
//!
//! Read from `<config_dir>/tock/config.json`, then overridden by
//! `TOCK_API_URL`, `TOCK_REQUEST_TIMEOUT_SECS` and `TOCK_OFFLINE`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

const APP_DIR: &str = "tock";
const CONFIG_FILE: &str = "config.json";
const DATABASE_FILE: &str = "tock.db";

pub const ENV_API_URL: &str = "TOCK_API_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "TOCK_REQUEST_TIMEOUT_SECS";
pub const ENV_OFFLINE: &str = "TOCK_OFFLINE";

/// Keys accepted by [`ClientConfig::set`]
pub const CONFIG_KEYS: [&str; 4] = ["api_base_url", "request_timeout_secs", "auto_sync", "offline"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Server root, without the `/api/v1` suffix. No remote when unset.
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Sync after every local mutation
    #[serde(default = "default_true")]
    pub auto_sync: bool,
    /// Treat the network as unavailable regardless of reachability
    #[serde(default)]
    pub offline: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            auto_sync: true,
            offline: false,
        }
    }
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_true() -> bool {
    true
}

impl ClientConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&raw)?;
        config.normalize()?;
        Ok(config)
    }

    /// Load from `path` and apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (normally the process env)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = normalize_text_option(lookup(ENV_API_URL)) {
            self.api_base_url = Some(url);
        }
        if let Some(timeout) = normalize_text_option(lookup(ENV_REQUEST_TIMEOUT_SECS)) {
            self.request_timeout_secs = parse_timeout(&timeout)?;
        }
        if let Some(offline) = normalize_text_option(lookup(ENV_OFFLINE)) {
            self.offline = parse_bool(&offline)?;
        }
        self.normalize()
    }

    /// Set one key from its textual value
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key.trim().replace('-', "_").as_str() {
            "api_base_url" | "api_url" => {
                self.api_base_url = normalize_text_option(Some(value.to_string()));
            }
            "request_timeout_secs" | "timeout" => {
                self.request_timeout_secs = parse_timeout(value)?;
            }
            "auto_sync" => self.auto_sync = parse_bool(value)?,
            "offline" => self.offline = parse_bool(value)?,
            other => {
                return Err(Error::InvalidInput(format!(
                    "unknown config key '{other}', expected one of: {}",
                    CONFIG_KEYS.join(", ")
                )))
            }
        }
        self.normalize()
    }

    /// Normalized API base URL, if a remote is configured
    pub fn api_endpoint(&self) -> Option<&str> {
        self.api_base_url.as_deref()
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn normalize(&mut self) -> Result<()> {
        self.api_base_url = match normalize_text_option(self.api_base_url.take()) {
            Some(url) if is_http_url(&url) => Some(url.trim_end_matches('/').to_string()),
            Some(url) => {
                return Err(Error::InvalidInput(format!(
                    "api_base_url must include http:// or https://, got '{url}'"
                )))
            }
            None => None,
        };
        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidInput(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_timeout(value: &str) -> Result<u64> {
    match value.trim().parse() {
        Ok(seconds) if seconds > 0 => Ok(seconds),
        _ => Err(Error::InvalidInput(format!(
            "invalid timeout '{value}', expected a positive number of seconds"
        ))),
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidInput(format!(
            "invalid boolean '{value}', expected true or false"
        ))),
    }
}

/// `<config_dir>/tock/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// `<data_dir>/tock/tock.db`
pub fn default_db_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR).join(DATABASE_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(config.auto_sync);
    }

    #[test]
    fn save_and_load_round_trip_normalizes_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = ClientConfig::default();
        config.set("api-url", " https://tock.example.com/ ").unwrap();
        config.set("auto_sync", "off").unwrap();
        config.save_to(&path).unwrap();

        let loaded = ClientConfig::load_from(&path).unwrap();
        assert_eq!(loaded.api_endpoint(), Some("https://tock.example.com"));
        assert!(!loaded.auto_sync);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = ClientConfig {
            api_base_url: Some("https://file.example.com".to_string()),
            ..ClientConfig::default()
        };
        config
            .apply_overrides(env(&[
                (ENV_API_URL, "http://localhost:3000/"),
                (ENV_REQUEST_TIMEOUT_SECS, "3"),
                (ENV_OFFLINE, "yes"),
            ]))
            .unwrap();
        assert_eq!(config.api_endpoint(), Some("http://localhost:3000"));
        assert_eq!(config.request_timeout_secs, 3);
        assert!(config.offline);
    }

    #[test]
    fn rejects_invalid_values() {
        let mut config = ClientConfig::default();
        assert!(config.set("api_base_url", "tock.example.com").is_err());
        assert!(config.set("timeout", "0").is_err());
        assert!(config.set("colour", "red").is_err());
        assert!(config
            .apply_overrides(env(&[(ENV_OFFLINE, "maybe")]))
            .is_err());
    }

    #[test]
    fn unknown_file_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_base_url":null,"surprise":1}"#).unwrap();
        assert!(matches!(
            ClientConfig::load_from(&path),
            Err(Error::Serialization(_))
        ));
    }
}
