//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml_minimal() {
        let config = Config::from_yaml("clickhouse:\n  host: localhost\n").unwrap();
        assert_eq!(config.clickhouse.port, 8123);
        assert_eq!(config.clickhouse.database, "default");
        assert_eq!(config.ingest.batch_size, 1000);
        assert_eq!(config.ingest.preview_limit, 100);
        assert!(!config.auth.enabled());
    }

    #[test]
    fn test_from_yaml_overrides() {
        let yaml = "clickhouse:\n  host: ch.internal\n  port: 9000\n  database: analytics\n\
                    ingest:\n  batch_size: 500\nauth:\n  secret: s3cret\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.clickhouse.url(), "http://ch.internal:9000");
        assert_eq!(config.ingest.batch_size, 500);
        assert!(config.auth.enabled());
    }

    #[test]
    fn test_from_yaml_invalid_rejected() {
        assert!(Config::from_yaml("clickhouse:\n  host: \"\"\n").is_err());
    }
}
