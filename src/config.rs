//! Configuration loading and persistence.
//!
//! The dashboard needs one thing from its environment: the application
//! origin that both the registry API and the embedded views are served
//! from. It is an explicit value injected at construction, never read from
//! ambient state.

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::{fs, path::PathBuf, time::Duration};

use crate::constants;

/// Configuration for the proxy dashboard.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Application origin (scheme, host, port).
    pub origin: String,
    /// Transport timeout in seconds for registry API calls.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: constants::DEFAULT_ORIGIN.to_string(),
            request_timeout_secs: constants::HTTP_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// Directory selection priority:
    /// 1. `PROXY_DASHBOARD_CONFIG_DIR` env var: explicit override
    /// 2. Default: platform config dir (Linux: ~/.config/proxy-dashboard)
    pub fn config_dir() -> Result<PathBuf> {
        let dir = if let Ok(dir) = std::env::var("PROXY_DASHBOARD_CONFIG_DIR") {
            PathBuf::from(dir)
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("proxy-dashboard")
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory {}", dir.display()))?;
        Ok(dir)
    }

    /// Loads configuration from file, with environment variable overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::load_from_file() {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("Ignoring unreadable config file: {:#}", e);
                Self::default()
            }
        };
        if config.request_timeout_secs == 0 {
            log::warn!("Ignoring request_timeout_secs = 0 in config file");
            config.request_timeout_secs = Self::default().request_timeout_secs;
        }
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a request timeout in whole seconds.
    ///
    /// # Errors
    ///
    /// Returns an error unless `value` is a positive integer. A zero timeout
    /// would fail every request before it is sent.
    pub fn parse_timeout(value: &str) -> Result<u64> {
        let secs: u64 = value
            .trim()
            .parse()
            .with_context(|| format!("Invalid timeout {:?}", value))?;
        if secs == 0 {
            anyhow::bail!("Timeout must be at least 1 second");
        }
        Ok(secs)
    }

    fn load_from_file() -> Result<Option<Self>> {
        let config_path = Self::config_dir()?.join("config.json");
        if !config_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(origin) = std::env::var("PROXY_DASHBOARD_ORIGIN") {
            self.origin = origin;
        }

        if let Ok(timeout) = std::env::var("PROXY_DASHBOARD_TIMEOUT_SECS") {
            match Self::parse_timeout(&timeout) {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(e) => log::warn!("Ignoring PROXY_DASHBOARD_TIMEOUT_SECS: {:#}", e),
            }
        }
    }

    /// Persists the current configuration to disk.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_dir()?.join("config.json");
        fs::write(&config_path, serde_json::to_string_pretty(self)?)?;

        // Owner read/write only
        #[cfg(unix)]
        fs::set_permissions(&config_path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }

    /// Parse and validate the origin.
    ///
    /// # Errors
    ///
    /// Returns an error unless the origin is an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url> {
        let url = Url::parse(&self.origin)
            .with_context(|| format!("Invalid origin {:?}", self.origin))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => anyhow::bail!("Origin must be http or https, got {:?}", other),
        }
    }

    /// Transport timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
