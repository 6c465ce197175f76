//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the
//! backend URL, the site API key used for public content, the last username
//! that signed in, and the navigation cache lifetime.
//!
//! Configuration is stored at `~/.config/mbc/config.json`. `MBC_API_URL`
//! and `MBC_API_KEY` override the stored values.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "mbc";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Session storage directory under the cache dir
const SESSION_DIR: &str = "session";

/// Backend used when nothing is configured (local CMS default port)
pub const DEFAULT_API_URL: &str = "http://localhost:1337/api";

/// Default navigation cache lifetime
pub const DEFAULT_NAVIGATION_TTL_MINUTES: i64 = 5;

/// Upper bound on the configured navigation cache lifetime (one week)
pub const MAX_NAVIGATION_TTL_MINUTES: i64 = 7 * 24 * 60;

pub const API_URL_ENV: &str = "MBC_API_URL";
pub const API_KEY_ENV: &str = "MBC_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub last_username: Option<String>,
    pub navigation_ttl_minutes: Option<i64>,
    /// Overrides the session directory (defaults to the OS cache dir)
    pub session_dir: Option<PathBuf>,
}

impl Config {
    /// Read the stored config file as written, without environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// The effective config: the stored file (or defaults when it cannot be
    /// read) with `MBC_API_URL` / `MBC_API_KEY` applied on top.
    pub fn load_with_env() -> Self {
        Self::resolve(Self::load(), |name| std::env::var(name).ok())
    }

    fn resolve(loaded: Result<Self>, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = loaded.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            Self::default()
        });
        config.apply_overrides(lookup);
        config
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply environment-style overrides; blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_blank(API_URL_ENV) {
            self.api_url = Some(url);
        }
        if let Some(key) = non_blank(API_KEY_ENV) {
            self.api_key = Some(key);
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn navigation_ttl_minutes(&self) -> i64 {
        self.navigation_ttl_minutes
            .filter(|m| *m > 0)
            .map(|m| m.min(MAX_NAVIGATION_TTL_MINUTES))
            .unwrap_or(DEFAULT_NAVIGATION_TTL_MINUTES)
    }

    pub fn session_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.session_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join(SESSION_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_url(), DEFAULT_API_URL);
        assert_eq!(config.navigation_ttl_minutes(), DEFAULT_NAVIGATION_TTL_MINUTES);
    }

    #[test]
    fn test_non_positive_ttl_falls_back() {
        let config = Config {
            navigation_ttl_minutes: Some(0),
            ..Default::default()
        };
        assert_eq!(config.navigation_ttl_minutes(), DEFAULT_NAVIGATION_TTL_MINUTES);
    }

    #[test]
    fn test_oversized_ttl_is_capped() {
        let config: Config =
            serde_json::from_str(r#"{"navigation_ttl_minutes":1000000000000}"#).unwrap();
        assert_eq!(config.navigation_ttl_minutes(), MAX_NAVIGATION_TTL_MINUTES);
    }

    #[test]
    fn test_env_applies_when_stored_config_is_unreadable() {
        let broken = serde_json::from_str::<Config>("{not json").map_err(anyhow::Error::from);
        let config = Config::resolve(broken, |name| match name {
            API_URL_ENV => Some("https://cms.example.org/api".to_string()),
            API_KEY_ENV => Some("site-key".to_string()),
            _ => None,
        });
        assert_eq!(config.api_url(), "https://cms.example.org/api");
        assert_eq!(config.api_key.as_deref(), Some("site-key"));
    }

    #[test]
    fn test_env_applies_over_stored_config() {
        let stored = Config {
            api_url: Some("https://old.example.org/api".to_string()),
            last_username: Some("thandim".to_string()),
            ..Default::default()
        };
        let config = Config::resolve(Ok(stored), |name| {
            (name == API_URL_ENV).then(|| "https://cms.example.org/api".to_string())
        });
        assert_eq!(config.api_url(), "https://cms.example.org/api");
        assert_eq!(config.last_username.as_deref(), Some("thandim"));
    }

    #[test]
    fn test_overrides() {
        let mut config = Config {
            api_url: Some("https://old.example.org/api".to_string()),
            api_key: Some("old".to_string()),
            ..Default::default()
        };
        config.apply_overrides(|name| match name {
            API_URL_ENV => Some("https://cms.example.org/api".to_string()),
            API_KEY_ENV => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(config.api_url(), "https://cms.example.org/api");
        assert_eq!(config.api_key.as_deref(), Some("old"));
    }

    #[test]
    fn test_explicit_session_dir() {
        let config = Config {
            session_dir: Some(PathBuf::from("/tmp/mbc-test")),
            ..Default::default()
        };
        assert_eq!(config.session_dir().unwrap(), PathBuf::from("/tmp/mbc-test"));
    }

    #[test]
    fn test_parses_partial_file() {
        let config: Config = serde_json::from_str(r#"{"api_key":"k"}"#).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert!(config.last_username.is_none());
    }
}
