//! Stream tailing configuration

use serde::Deserialize;

/// Stream tailing configuration
///
/// # Example
///
/// ```toml
/// [read]
/// rate = 10.0
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReadConfig {
    /// Default poll rate (polls per second) applied when a `read` is issued
    /// without an explicit rate. Unset means poll as fast as the bus allows.
    pub rate: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unbounded() {
        assert!(ReadConfig::default().rate.is_none());
    }

    #[test]
    fn test_deserialize_rate() {
        let config: ReadConfig = toml::from_str("rate = 10.0").unwrap();
        assert_eq!(config.rate, Some(10.0));
    }
}
