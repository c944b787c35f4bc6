//! Daemon configuration.
//!
//! Values are layered, later layers winning:
//! 1. Built-in defaults
//! 2. TOML file (`--config <path>` or `WEBTIME_CONFIG`)
//! 3. Environment overrides (`WEBTIME_PORT`, `WEBTIME_TICK_INTERVAL_MS`)
//! 4. Command-line flags (applied by the binary)
//!
//! ```toml
//! host = "localhost"
//! bind = "0.0.0.0"
//! port = 8888
//! tick_interval_ms = 1000
//! time_format = "%H:%M:%S %Z"
//! ```

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use webtime_core::{WallClock, DEFAULT_TIME_FORMAT};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "WEBTIME_CONFIG";

/// Environment variable overriding the HTTP port.
pub const PORT_ENV: &str = "WEBTIME_PORT";

/// Environment variable overriding the tick interval in milliseconds.
pub const TICK_INTERVAL_ENV: &str = "WEBTIME_TICK_INTERVAL_MS";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8888;

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    /// Host name shown in the startup log
    pub host: String,

    /// Address to bind the HTTP listener to
    pub bind: String,

    /// HTTP port
    pub port: u16,

    /// Milliseconds between ticks
    pub tick_interval_ms: u64,

    /// chrono strftime layout for the published time
    pub time_format: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            tick_interval_ms: 1000,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
        }
    }
}

impl DaemonConfig {
    /// Loads defaults, then the file at `path` if given, then env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Reads a TOML config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parses TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(PORT_ENV) {
            self.port = port.trim().parse().map_err(|_| ConfigError::Env {
                key: PORT_ENV,
                value: port,
            })?;
        }

        if let Some(ms) = lookup(TICK_INTERVAL_ENV) {
            self.tick_interval_ms = ms.trim().parse().map_err(|_| ConfigError::Env {
                key: TICK_INTERVAL_ENV,
                value: ms,
            })?;
        }

        Ok(())
    }

    /// Checks values that would otherwise fail later at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "tick_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }

        self.wall_clock()?;
        self.socket_addr()?;
        Ok(())
    }

    /// Returns the tick interval.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Builds the wall-clock tick source for `time_format`.
    pub fn wall_clock(&self) -> Result<WallClock, ConfigError> {
        WallClock::new(self.time_format.clone()).map_err(|e| ConfigError::Invalid {
            field: "time_format",
            reason: e.to_string(),
        })
    }

    /// Returns the address to bind the listener to.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.bind.parse().map_err(|_| ConfigError::Invalid {
            field: "bind",
            reason: format!("{:?} is not an IP address", self.bind),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {error}")]
    Read { path: PathBuf, error: String },

    #[error("Failed to parse config file {path}: {error}")]
    ParseFile { path: PathBuf, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {value:?}")]
    Env { key: &'static str, value: String },

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DaemonConfig::default();
        assert_eq!(config.port, 8888);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.time_format, DEFAULT_TIME_FORMAT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DaemonConfig::from_toml_str("port = 9000\n").unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.bind, "0.0.0.0");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = DaemonConfig::from_toml_str("colour = \"red\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tick_interval_ms = 250").unwrap();
        writeln!(file, "time_format = \"%H:%M\"").unwrap();

        let config = DaemonConfig::from_file(file.path()).unwrap();
        assert_eq!(config.tick_interval(), Duration::from_millis(250));
        assert_eq!(config.time_format, "%H:%M");
    }

    #[test]
    fn test_from_file_parse_error_names_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"eighty\"").unwrap();

        let err = DaemonConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DaemonConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = DaemonConfig::default();
        config
            .apply_env(env(&[(PORT_ENV, "9100"), (TICK_INTERVAL_ENV, " 500 ")]))
            .unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.tick_interval_ms, 500);
    }

    #[test]
    fn test_env_rejects_garbage() {
        let mut config = DaemonConfig::default();
        let err = config.apply_env(env(&[(PORT_ENV, "http")])).unwrap_err();
        assert!(err.to_string().contains(PORT_ENV));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = DaemonConfig {
            tick_interval_ms: 0,
            ..DaemonConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "tick_interval_ms",
                ..
            })
        ));
    }

    #[test]
    fn test_subscription_capacity_is_not_configurable() {
        let err = DaemonConfig::from_toml_str("subscription_capacity = 4\n").unwrap_err();
        assert!(err.to_string().contains("subscription_capacity"));
    }

    #[test]
    fn test_validate_rejects_bad_format() {
        let config = DaemonConfig {
            time_format: String::new(),
            ..DaemonConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "time_format",
                ..
            })
        ));
    }

    #[test]
    fn test_socket_addr() {
        let config = DaemonConfig {
            bind: "127.0.0.1".to_string(),
            port: 4000,
            ..DaemonConfig::default()
        };
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:4000");

        let bad = DaemonConfig {
            bind: "localhost".to_string(),
            ..DaemonConfig::default()
        };
        assert!(bad.socket_addr().is_err());
    }
}
