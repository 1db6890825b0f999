//! TOML-based configuration persistence for the host.
//!
//! Reads and writes [`AppConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Rein\host.toml`
//! - Linux:    `~/.config/rein/host.toml`
//! - macOS:    `~/Library/Application Support/Rein/host.toml`
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 3000
//! auth_token = "4f9c..."
//!
//! [input]
//! invert_scroll = false
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every field has a serde default, so a missing file, a missing section or
//! an older file without newer fields all load cleanly.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::HostConfig;

const CONFIG_FILE_NAME: &str = "host.toml";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// `bind_address` and `port` do not form a socket address.
    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Host configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub input: InputSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Listener and authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSettings {
    /// IP address to bind to. `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port of the WebSocket listener.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Token remotes must present. Absent means no authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

/// Input replay settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InputSettings {
    #[serde(default)]
    pub invert_scroll: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            auth_token: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

impl AppConfig {
    /// Converts the stored settings into the server's runtime config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBindAddress`] if `bind_address` is not an
    /// IP address.
    pub fn to_host_config(&self) -> Result<HostConfig, ConfigError> {
        let ip: IpAddr = self
            .server
            .bind_address
            .trim_matches(|c| c == '[' || c == ']')
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(self.server.bind_address.clone()))?;
        Ok(HostConfig {
            bind_addr: SocketAddr::new(ip, self.server.port),
            auth_token: self.server.auth_token.clone().filter(|t| !t.is_empty()),
            invert_scroll: self.input.invert_scroll,
        })
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    rein_core::platform::config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Loads [`AppConfig`] from `path`, returning the default if the file does
/// not exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
