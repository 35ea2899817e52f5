//! Configuration loading and management
//!
//! tally never looks for a config file on its own. Hosts either build a
//! [`Config`] in code or point [`Config::load_from`] at a TOML file of their
//! choosing:
//!
//! ```toml
//! [dispatch]
//! endpoint = "http://www.google-analytics.com/collect"
//! timeout_secs = 2.0
//! app_name = "myapp"
//! app_version = "1.4.0"
//!
//! [identity]
//! path = "/home/me/.tally"
//!
//! [logging]
//! level = "debug"
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default analytics collector endpoint
pub const DEFAULT_ENDPOINT: &str = "http://www.google-analytics.com/collect";

/// Name used for the identity file, log directory and default user agent
pub const APP_NAME: &str = "tally";

/// Returns a best-effort home directory path.
pub(crate) fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Event dispatch configuration
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Identity file location
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Event dispatcher configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DispatchConfig {
    /// Collector URL events are POSTed to
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Default per-event timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Application name used to compose the user agent
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Application version used to compose the user agent
    #[serde(default)]
    pub app_version: Option<String>,

    /// Full user-agent string; overrides `app_name`/`app_version`
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Threads in the background dispatch pool
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            app_name: default_app_name(),
            app_version: None,
            user_agent: None,
            worker_threads: default_worker_threads(),
        }
    }
}

impl DispatchConfig {
    /// Default per-event timeout
    ///
    /// Falls back to two seconds when `timeout_secs` is not a valid duration.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_timeout_secs()))
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(Error::Config("dispatch.endpoint is required".to_string()));
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(Error::Config(format!(
                "dispatch.endpoint must be an http(s) URL, got {:?}",
                endpoint
            )));
        }
        if !self.timeout_secs.is_finite() || self.timeout_secs <= 0.0 {
            return Err(Error::Config(
                "dispatch.timeout_secs must be a positive number".to_string(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(Error::Config(
                "dispatch.worker_threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> f64 {
    2.0
}

fn default_app_name() -> String {
    APP_NAME.to_string()
}

fn default_worker_threads() -> usize {
    1
}

/// Identity file configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct IdentityConfig {
    /// Override for the identity file (default `~/.tally`)
    pub path: Option<PathBuf>,
}

impl IdentityConfig {
    /// Resolved identity file path
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(Config::identity_path)
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.dispatch.validate()?;
        Ok(config)
    }

    /// Returns the default identity file path
    ///
    /// `~/.tally`
    pub fn identity_path() -> PathBuf {
        home_dir().join(format!(".{}", APP_NAME))
    }

    /// Returns the state directory path (for logs)
    ///
    /// `~/.local/state/tally/` on Linux, the platform equivalent elsewhere
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| home_dir().join(".local/state"))
            .join(APP_NAME)
    }
}
