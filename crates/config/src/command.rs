//! Command exchange configuration

use serde::Deserialize;

/// Default wait for a correlated command response, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Command exchange configuration
///
/// # Example
///
/// ```toml
/// [command]
/// timeout_ms = 5000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// How long to wait for a correlated response before the exchange
    /// fails. Default: 1000
    pub timeout_ms: u64,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        assert_eq!(CommandConfig::default().timeout_ms, 1000);
    }

    #[test]
    fn test_deserialize_timeout() {
        let config: CommandConfig = toml::from_str("timeout_ms = 5000").unwrap();
        assert_eq!(config.timeout_ms, 5000);
    }
}
