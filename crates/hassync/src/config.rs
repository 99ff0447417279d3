//! Configuration file parsing and structures.
//!
//! hassync reads a single TOML file. Every section except `[connection]` is
//! optional; the access token may instead come from `HASSYNC_TOKEN` so it can
//! stay out of the file.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;

use crate::error::Error;

/// Environment variable that overrides `connection.token`
pub const TOKEN_ENV: &str = "HASSYNC_TOKEN";

/// Shortest address that can plausibly name a server (`ws://a.bc` is 9)
const MIN_URL_LEN: usize = 10;

/// Top-level configuration structure
#[derive(Debug, Deserialize)]
pub struct Config {
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub rename: RenameConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `"hassync::ha" = "debug"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

impl LoggingConfig {
    /// Build the subscriber filter for this configuration
    pub fn targets(&self) -> Targets {
        self.overrides.iter().fold(
            Targets::new().with_default(LevelFilter::from(self.level)),
            |targets, (target, level)| {
                targets.with_target(target.clone(), LevelFilter::from(*level))
            },
        )
    }
}

/// Address and credential of the remote registry
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Base address, e.g. `http://homeassistant.local:8123`
    pub url: String,

    /// Long-lived access token
    #[serde(default)]
    pub token: String,

    /// Bound on every wait for the remote; 0 waits forever
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl ConnectionConfig {
    /// Reject an empty token or an implausibly short address.
    pub fn validate(&self) -> Result<(), Error> {
        let url = self.url.trim();
        if url.len() < MIN_URL_LEN {
            return Err(Error::Configuration(format!(
                "connection.url '{}' is too short to be a server address",
                url
            )));
        }
        if self.token.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "connection.token is empty (set it in the config file or {})",
                TOKEN_ENV
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_snapshot_path")]
    pub path: PathBuf,
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("localData/ha_entities_output.yaml")
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: default_snapshot_path(),
        }
    }
}

/// Which entities end up in the snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Entity domains to keep (the part of `entity_id` before the first `.`)
    #[serde(default = "default_domains")]
    pub domains: Vec<String>,
}

fn default_domains() -> Vec<String> {
    [
        "light",
        "switch",
        "climate",
        "vacuum",
        "calendar",
        "tag",
        "device_tracker",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            domains: default_domains(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameConfig {
    /// First request id used for the rename batch
    #[serde(default = "default_id_base")]
    pub id_base: u64,

    /// Number of pending renames shown before asking for confirmation
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
}

fn default_id_base() -> u64 {
    2000
}

fn default_preview_limit() -> usize {
    5
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            id_base: default_id_base(),
            preview_limit: default_preview_limit(),
        }
    }
}

/// External tool the snapshot can be handed to after export
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    /// Program and leading arguments; the search term is appended
    #[serde(default)]
    pub command: Vec<String>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Load, apply environment overrides and validate.
    ///
    /// Every failure here is reported before any network access.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let mut config = Self::from_file(path)?;
        config.override_token(std::env::var(TOKEN_ENV).ok());
        config.connection.validate()?;
        Ok(config)
    }

    fn override_token(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.connection.token = token;
        }
        self.connection.url = self.connection.url.trim().to_string();
        self.connection.token = self.connection.token.trim().to_string();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Configuration(e.to_string())
    }
}
