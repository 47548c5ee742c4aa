//! Bus connection configuration

use std::path::PathBuf;

use serde::Deserialize;

/// Default socket path of the bus daemon
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/rill-bus.sock";

/// Bus connection configuration
///
/// # Example
///
/// ```toml
/// [bus]
/// socket = "/run/rill/bus.sock"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Unix socket path of the bus daemon
    pub socket: PathBuf,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            socket: PathBuf::from(DEFAULT_SOCKET_PATH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_socket() {
        let config = BusConfig::default();
        assert_eq!(config.socket.to_str().unwrap(), DEFAULT_SOCKET_PATH);
    }

    #[test]
    fn test_deserialize_socket() {
        let config: BusConfig = toml::from_str("socket = \"/run/rill/bus.sock\"").unwrap();
        assert_eq!(config.socket.to_str().unwrap(), "/run/rill/bus.sock");
    }
}
