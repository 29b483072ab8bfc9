//! Client configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables (`ADIVINA_CONFIG`, `ADIVINA_SERVER_URL`)
//! 3. TOML config file (`<config dir>/adivina/config.toml` by default)
//! 4. Built-in defaults (fallback)
//!
//! A missing config file is not an error: a warning is logged and the
//! built-in defaults are used. A config file that exists but does not parse
//! is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV: &str = "ADIVINA_CONFIG";

/// Environment variable overriding the game server base URL
pub const SERVER_URL_ENV: &str = "ADIVINA_SERVER_URL";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the game server (no trailing path)
    pub server_url: String,

    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,

    /// How long a staged preview may take to become playable
    pub media_ready_timeout_secs: u64,

    /// Playback volume for fragments (0.0-1.0)
    pub fragment_volume: f32,

    /// Scan untyped server payloads for artist-only flags when the server
    /// does not send an explicit `parcial` field
    pub legacy_payload_scan: bool,

    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_secs: 30,
            media_ready_timeout_secs: 10,
            fragment_volume: 0.7,
            legacy_payload_scan: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validated()
    }

    /// Load and validate a TOML file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn media_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.media_ready_timeout_secs)
    }

    /// Replace the server URL, validating it
    pub fn with_server_url(mut self, url: &str) -> Result<Self> {
        self.server_url = url.to_string();
        self.validated()
    }

    fn validated(mut self) -> Result<Self> {
        let url = self.server_url.trim().trim_end_matches('/').to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::InvalidInput(format!(
                "server_url must be an http(s) URL, got {:?}",
                self.server_url
            )));
        }
        self.server_url = url;

        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be > 0".to_string()));
        }
        if self.media_ready_timeout_secs == 0 {
            return Err(Error::Config(
                "media_ready_timeout_secs must be > 0".to_string(),
            ));
        }

        if !self.fragment_volume.is_finite() {
            return Err(Error::Config(format!(
                "fragment_volume must be a number, got {}",
                self.fragment_volume
            )));
        }
        if !(0.0..=1.0).contains(&self.fragment_volume) {
            warn!(
                "fragment_volume {} out of range, clamping to 0.0-1.0",
                self.fragment_volume
            );
            self.fragment_volume = self.fragment_volume.clamp(0.0, 1.0);
        }

        Ok(self)
    }
}

/// Default config file location for the platform
///
/// `~/.config/adivina/config.toml` on Linux, the platform config directory
/// elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("adivina").join("config.toml"))
}

/// Resolves [`ClientConfig`] from CLI arguments, environment, file and defaults
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_config_path: Option<PathBuf>,
    cli_server_url: Option<String>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config file given on the command line
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.cli_config_path = path;
        self
    }

    /// Server URL given on the command line
    pub fn with_server_url(mut self, url: Option<String>) -> Self {
        self.cli_server_url = url;
        self
    }

    /// Config file to read: CLI argument, then `ADIVINA_CONFIG`, then the
    /// platform default
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_config_path {
            return Some(path.clone());
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        default_config_path()
    }

    /// Resolve the effective configuration
    pub fn resolve(&self) -> Result<ClientConfig> {
        let mut config = match self.config_path() {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                ClientConfig::load_file(&path)?
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                ClientConfig::default()
            }
            None => {
                warn!("Could not determine config directory, using built-in defaults");
                ClientConfig::default()
            }
        };

        let env_url = std::env::var(SERVER_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty());
        if let Some(url) = self.cli_server_url.as_ref().or(env_url.as_ref()) {
            debug!("Server URL override: {}", url);
            config = config.with_server_url(url)?;
        }

        Ok(config)
    }
}
