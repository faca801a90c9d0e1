//! TOML Configuration File Support
//!
//! Configuration for the daemon and the console, loaded from
//! `~/.config/tally/tally.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:5173"
//!
//! [stream]
//! tick_limit = 10
//! tick_period_ms = 1000
//! channel_capacity = 16
//! keep_alive_secs = 15
//!
//! [client]
//! stream_url = "http://127.0.0.1:5173/stream-resource"
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::source::DEFAULT_STREAM_URL;
use crate::stream::StreamConfig;

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:5173";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Server section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// Listen address
    pub bind: Option<String>,
}

/// Stream section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamToml {
    /// Ticks before the exit event
    pub tick_limit: Option<u32>,

    /// Milliseconds between ticks
    pub tick_period_ms: Option<u64>,

    /// Events buffered per session
    pub channel_capacity: Option<usize>,

    /// Seconds between keep-alive comments
    pub keep_alive_secs: Option<u64>,
}

/// Client section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// URL the console streams from
    pub stream_url: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyToml {
    /// Server configuration section
    pub server: ServerToml,

    /// Stream configuration section
    pub stream: StreamToml,

    /// Client configuration section
    pub client: ClientToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved configuration
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct TallyConfigFile {
    /// Address the daemon listens on
    pub bind: SocketAddr,

    /// Timer stream settings
    pub stream: StreamConfig,

    /// URL the console streams from
    pub stream_url: String,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for TallyConfigFile {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5173)),
            stream: StreamConfig::default(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl TallyConfigFile {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream.tick_limit == 0 {
            return Err(ConfigError::ValidationError(
                "tick_limit must be at least 1".into(),
            ));
        }
        if self.stream.tick_period.is_zero() {
            return Err(ConfigError::ValidationError(
                "tick_period_ms must be at least 1".into(),
            ));
        }
        if self.stream.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "channel_capacity must be at least 1".into(),
            ));
        }
        if self.stream.keep_alive.is_zero() {
            return Err(ConfigError::ValidationError(
                "keep_alive_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/tally/tally.toml` or
/// `~/.config/tally/tally.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tally").join("tally.toml"))
}

/// Load configuration from the default path, then the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or a
/// value is out of range. A missing config file is not an error.
pub fn load_config() -> Result<TallyConfigFile, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path, then the environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or a value is out of range.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<TallyConfigFile, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

fn load_config_with_env(
    path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<TallyConfigFile, ConfigError> {
    let mut config = TallyConfigFile::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: TallyToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);
    config.validate()?;

    Ok(config)
}

fn parse_bind(value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("bind {value:?} is not a socket address")))
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut TallyConfigFile, toml: &TallyToml) -> Result<(), ConfigError> {
    if let Some(ref bind) = toml.server.bind {
        config.bind = parse_bind(bind)?;
    }

    if let Some(limit) = toml.stream.tick_limit {
        config.stream.tick_limit = limit;
    }
    if let Some(period) = toml.stream.tick_period_ms {
        config.stream.tick_period = Duration::from_millis(period);
    }
    if let Some(capacity) = toml.stream.channel_capacity {
        config.stream.channel_capacity = capacity;
    }
    if let Some(keep_alive) = toml.stream.keep_alive_secs {
        config.stream.keep_alive = Duration::from_secs(keep_alive);
    }

    if let Some(ref url) = toml.client.stream_url {
        config.stream_url = url.clone();
    }
    Ok(())
}

/// Apply environment variable overrides to the config
///
/// Unparseable values are ignored with a warning.
fn apply_env_config(config: &mut TallyConfigFile, env: impl Fn(&str) -> Option<String>) {
    if let Some(bind) = env("TALLY_BIND") {
        match bind.parse() {
            Ok(addr) => {
                config.bind = addr;
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %bind, "Ignoring invalid TALLY_BIND"),
        }
    }
    if let Some(limit) = env("TALLY_TICK_LIMIT") {
        match limit.parse::<u32>() {
            Ok(n) => {
                config.stream.tick_limit = n;
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %limit, "Ignoring invalid TALLY_TICK_LIMIT"),
        }
    }
    if let Some(period) = env("TALLY_TICK_PERIOD_MS") {
        match period.parse::<u64>() {
            Ok(ms) => {
                config.stream.tick_period = Duration::from_millis(ms);
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %period, "Ignoring invalid TALLY_TICK_PERIOD_MS"),
        }
    }
    if let Some(url) = env("TALLY_STREAM_URL") {
        config.stream_url = url;
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Command-line overrides, applied after [`load_config`]
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Listen address override
    pub bind: Option<SocketAddr>,

    /// Tick limit override
    pub tick_limit: Option<u32>,

    /// Tick period override (milliseconds)
    pub tick_period_ms: Option<u64>,

    /// Stream URL override
    pub stream_url: Option<String>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any override is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bind.is_none()
            && self.tick_limit.is_none()
            && self.tick_period_ms.is_none()
            && self.stream_url.is_none()
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut TallyConfigFile) {
        if !self.is_empty() {
            config.source = ConfigSource::Cli;
        }

        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(limit) = self.tick_limit {
            config.stream.tick_limit = limit;
        }
        if let Some(ms) = self.tick_period_ms {
            config.stream.tick_period = Duration::from_millis(ms);
        }
        if let Some(ref url) = self.stream_url {
            config.stream_url = url.clone();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
