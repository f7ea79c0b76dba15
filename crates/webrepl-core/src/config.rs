//! Configuration for the WebREPL stream.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $WEBREPL_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/webrepl/config.toml
//!   3. ~/.config/webrepl/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::protocol::{ws_url, DEFAULT_PORT};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebReplConfig {
    pub connection: ConnectionConfig,
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Device address. Empty = must be supplied on the command line.
    pub host: String,
    pub port: u16,
    /// Sent in clear text; the WebREPL protocol has no encryption layer.
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Budget for each login step.
    pub handshake_secs: f64,
    /// Budget for reads once the stream is ready.
    pub steady_secs: f64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            password: String::new(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            handshake_secs: 5.0,
            steady_secs: 1.0,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("webrepl")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid {name} timeout: {value}")]
    InvalidTimeout { name: &'static str, value: f64 },
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl WebReplConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            Self::from_toml(&path, &text)?
        } else {
            WebReplConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn from_toml(path: &std::path::Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("WEBREPL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&WebReplConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// `ws://<host>:<port>`
    pub fn url(&self) -> String {
        ws_url(&self.connection.host, self.connection.port)
    }

    /// Apply WEBREPL_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("WEBREPL_CONNECTION__HOST") {
            self.connection.host = v;
        }
        if let Ok(v) = std::env::var("WEBREPL_CONNECTION__PORT") {
            if let Ok(p) = v.parse() {
                self.connection.port = p;
            }
        }
        if let Ok(v) = std::env::var("WEBREPL_CONNECTION__PASSWORD") {
            self.connection.password = v;
        }
        if let Ok(v) = std::env::var("WEBREPL_TIMEOUTS__HANDSHAKE_SECS") {
            if let Ok(s) = v.parse() {
                self.timeouts.handshake_secs = s;
            }
        }
        if let Ok(v) = std::env::var("WEBREPL_TIMEOUTS__STEADY_SECS") {
            if let Ok(s) = v.parse() {
                self.timeouts.steady_secs = s;
            }
        }
    }
}

impl TimeoutConfig {
    pub fn handshake(&self) -> Result<Duration, ConfigError> {
        secs("handshake", self.handshake_secs)
    }

    pub fn steady(&self) -> Result<Duration, ConfigError> {
        secs("steady", self.steady_secs)
    }
}

/// Zero is rejected: a zero read budget turns every blocking read into a
/// busy poll.
fn secs(name: &'static str, value: f64) -> Result<Duration, ConfigError> {
    match Duration::try_from_secs_f64(value) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(ConfigError::InvalidTimeout { name, value }),
    }
}
