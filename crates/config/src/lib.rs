//! Rill Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use rill_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[command]\ntimeout_ms = 5000").unwrap();
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! [bus]
//! socket = "/run/rill/bus.sock"
//!
//! [log]
//! level = "debug"
//!
//! [command]
//! timeout_ms = 5000
//!
//! [read]
//! rate = 10.0
//! ```

mod bus;
mod command;
mod error;
mod logging;
mod read;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use bus::{BusConfig, DEFAULT_SOCKET_PATH};
pub use command::{CommandConfig, DEFAULT_TIMEOUT_MS};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogLevel};
pub use read::ReadConfig;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bus connection settings
    pub bus: BusConfig,

    /// Logging configuration
    pub log: LogConfig,

    /// Command exchange settings
    pub command: CommandConfig,

    /// Stream tailing settings
    pub read: ReadConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.command.timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "command",
                "timeout_ms",
                "must be greater than zero",
            ));
        }
        if let Some(rate) = self.read.rate {
            if !(rate > 0.0) {
                return Err(ConfigError::invalid_value(
                    "read",
                    "rate",
                    "must be a positive number",
                ));
            }
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.bus.socket.to_str().unwrap(), DEFAULT_SOCKET_PATH);
        assert_eq!(config.command.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.log.level, LogLevel::Info);
        assert!(config.read.rate.is_none());
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[bus]
socket = "/run/rill/bus.sock"

[log]
level = "debug"

[command]
timeout_ms = 5000

[read]
rate = 2.5
"#;
        let config = Config::from_str(toml).unwrap();

        assert_eq!(config.bus.socket.to_str().unwrap(), "/run/rill/bus.sock");
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.command.timeout_ms, 5000);
        assert_eq!(config.read.rate, Some(2.5));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = Config::from_str("[command]\ntimeout_ms = 0");
        assert!(result.is_err());
    }

    #[test]
    fn test_nonpositive_rate_rejected() {
        assert!(Config::from_str("[read]\nrate = 0.0").is_err());
        assert!(Config::from_str("[read]\nrate = -1.0").is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_str("invalid { toml");
        assert!(result.is_err());
    }
}
