//! Client configuration.
//!
//! Resolution order for each setting: environment variable, then the value
//! kept in the credential store, then the built-in default.

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::api::{normalize_base_url, DEFAULT_TIMEOUT};
use crate::storage;

pub const ENV_API_URL: &str = "CAJA_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "CAJA_API_TIMEOUT_SECS";
pub const ENV_LOG_DIR: &str = "CAJA_LOG_DIR";

const DEFAULT_BASE_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Load from the environment and the credential store.
    pub fn load() -> Self {
        Self::resolve(storage::get_credential(storage::KEY_API_BASE_URL))
    }

    /// Load with an explicit stored URL (or none), leaving the credential
    /// store out of it.
    pub fn resolve(stored_url: Option<String>) -> Self {
        let base_url = env_value(ENV_API_URL)
            .or(stored_url.filter(|u| !u.trim().is_empty()))
            .map(|u| normalize_base_url(&u))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = match env_value(ENV_TIMEOUT_SECS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!(value = %raw, "ignoring invalid {ENV_TIMEOUT_SECS}");
                    DEFAULT_TIMEOUT
                }
            },
            None => DEFAULT_TIMEOUT,
        };

        Self { base_url, timeout }
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Directory for rolling log files.
pub fn log_dir() -> PathBuf {
    if let Some(dir) = env_value(ENV_LOG_DIR) {
        return PathBuf::from(dir);
    }
    let base = std::env::var("LOCALAPPDATA")
        .or_else(|_| std::env::var("XDG_DATA_HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            #[cfg(target_os = "windows")]
            {
                PathBuf::from(std::env::var("USERPROFILE").unwrap_or_else(|_| ".".into()))
                    .join("AppData")
                    .join("Local")
            }
            #[cfg(not(target_os = "windows"))]
            {
                PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
                    .join(".local")
                    .join("share")
            }
        });
    base.join("caja-client").join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var(ENV_API_URL);
        std::env::remove_var(ENV_TIMEOUT_SECS);
        std::env::remove_var(ENV_LOG_DIR);
    }

    #[test]
    #[serial]
    fn defaults_apply_without_env_or_stored_url() {
        clear_env();
        assert_eq!(ClientConfig::resolve(None), ClientConfig::default());
    }

    #[test]
    #[serial]
    fn env_url_wins_over_stored_url() {
        clear_env();
        std::env::set_var(ENV_API_URL, "pos.example.com/api/");
        let config = ClientConfig::resolve(Some("http://stored:5000".into()));
        assert_eq!(config.base_url, "https://pos.example.com");
        clear_env();
    }

    #[test]
    #[serial]
    fn stored_url_is_normalised() {
        clear_env();
        let config = ClientConfig::resolve(Some("localhost:7100/".into()));
        assert_eq!(config.base_url, "http://localhost:7100");
    }

    #[test]
    #[serial]
    fn invalid_timeout_falls_back_to_default() {
        clear_env();
        std::env::set_var(ENV_TIMEOUT_SECS, "zero");
        assert_eq!(ClientConfig::resolve(None).timeout, DEFAULT_TIMEOUT);
        std::env::set_var(ENV_TIMEOUT_SECS, "5");
        assert_eq!(ClientConfig::resolve(None).timeout, Duration::from_secs(5));
        clear_env();
    }

    #[test]
    #[serial]
    fn log_dir_env_override() {
        clear_env();
        std::env::set_var(ENV_LOG_DIR, "/tmp/caja-logs");
        assert_eq!(log_dir(), PathBuf::from("/tmp/caja-logs"));
        clear_env();
    }
}
