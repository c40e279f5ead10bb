//! Configuration management for nodeload.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use nodeload_server::config::NodeloadConfig;
//!
//! // Load from file with env overrides
//! let config = NodeloadConfig::load("nodeload.yaml")?;
//!
//! // Or load from environment only
//! let config = NodeloadConfig::from_env()?;
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::handlers::loader::MAX_BATCH_SIZE;

/// Environment variable prefix; `NODELOAD_LOADER__FETCH_TIMEOUT_MS` maps
/// to `loader.fetch_timeout_ms`.
const ENV_PREFIX: &str = "NODELOAD";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct NodeloadConfig {
    /// Batch loader settings
    #[serde(default)]
    pub loader: LoaderSettings,

    /// Storage settings
    #[serde(default)]
    pub storage: StorageSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Metrics settings
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// Batch loader settings.
///
/// # Example YAML Configuration
///
/// ```yaml
/// loader:
///   max_batch_size: 50
///   fetch_timeout_ms: 5000
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoaderSettings {
    /// Maximum number of loads in one request. Capped at `MAX_BATCH_SIZE`.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Upper bound on one resolution, in milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

impl LoaderSettings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

fn default_max_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

/// Storage backend settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StorageSettings {
    /// Storage backend type. Only "memory" is supported.
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Fixture file (JSON or YAML) used to seed the memory backend.
    pub fixtures_path: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            fixtures_path: None,
        }
    }
}

fn default_storage_backend() -> String {
    "memory".to_string()
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,

    /// Log span enter/exit events
    #[serde(default)]
    pub spans: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            spans: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MetricsSettings {
    /// Record load counters through the `metrics` facade
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl NodeloadConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `NODELOAD_` and use `__` as separator.
    /// For example:
    /// - `NODELOAD_LOADER__MAX_BATCH_SIZE=25` overrides `loader.max_batch_size`
    /// - `NODELOAD_STORAGE__FIXTURES_PATH=...` overrides `storage.fixtures_path`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&NodeloadConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()?;

        let nodeload_config: NodeloadConfig = config.try_deserialize()?;
        nodeload_config.validate()?;

        Ok(nodeload_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&NodeloadConfig::default())?)
            .add_source(env_source())
            .build()?;

        let nodeload_config: NodeloadConfig = config.try_deserialize()?;
        nodeload_config.validate()?;

        Ok(nodeload_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.loader.max_batch_size == 0 || self.loader.max_batch_size > MAX_BATCH_SIZE {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "loader.max_batch_size must be between 1 and {}, got: {}",
                    MAX_BATCH_SIZE, self.loader.max_batch_size
                ),
            });
        }

        if self.loader.fetch_timeout_ms == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "loader.fetch_timeout_ms must be greater than 0".to_string(),
            });
        }

        let valid_backends = ["memory"];
        if !valid_backends.contains(&self.storage.backend.as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "storage.backend must be one of: {:?}, got: {}",
                    valid_backends, self.storage.backend
                ),
            });
        }

        if self
            .storage
            .fixtures_path
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            return Err(ConfigLoadError::Invalid {
                message: "storage.fixtures_path cannot be empty".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
loader:
  max_batch_size: 25
  fetch_timeout_ms: 1500

storage:
  backend: memory
  fixtures_path: /srv/nodeload/fixtures.yaml

logging:
  level: debug
  json: true
  spans: true

metrics:
  enabled: false
"#
        )
        .unwrap();

        let config = NodeloadConfig::load(file.path()).unwrap();

        assert_eq!(config.loader.max_batch_size, 25);
        assert_eq!(config.loader.fetch_timeout(), Duration::from_millis(1500));
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(
            config.storage.fixtures_path.as_deref(),
            Some("/srv/nodeload/fixtures.yaml")
        );
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert!(config.logging.spans);
        assert!(!config.metrics.enabled);
    }

    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
loader:
  max_batch_size: 25

logging:
  level: info
"#
        )
        .unwrap();

        std::env::set_var("NODELOAD_LOADER__FETCH_TIMEOUT_MS", "250");
        std::env::set_var("NODELOAD_LOGGING__LEVEL", "warn");

        let config = NodeloadConfig::load(file.path());

        std::env::remove_var("NODELOAD_LOADER__FETCH_TIMEOUT_MS");
        std::env::remove_var("NODELOAD_LOGGING__LEVEL");

        let config = config.unwrap();
        assert_eq!(config.loader.fetch_timeout_ms, 250); // Overridden by env
        assert_eq!(config.loader.max_batch_size, 25); // From file
        assert_eq!(config.logging.level, "warn"); // Overridden by env
    }

    #[test]
    fn test_config_validation_catches_errors() {
        let cases: [(fn(&mut NodeloadConfig), &str); 6] = [
            (|c| c.loader.max_batch_size = 0, "loader.max_batch_size"),
            (
                |c| c.loader.max_batch_size = MAX_BATCH_SIZE + 1,
                "loader.max_batch_size",
            ),
            (|c| c.loader.fetch_timeout_ms = 0, "loader.fetch_timeout_ms"),
            (|c| c.storage.backend = "postgres".to_string(), "storage.backend"),
            (
                |c| c.storage.fixtures_path = Some("  ".to_string()),
                "storage.fixtures_path",
            ),
            (|c| c.logging.level = "verbose".to_string(), "logging.level"),
        ];

        for (mutate, field) in cases {
            let mut config = NodeloadConfig::default();
            mutate(&mut config);
            let err = config.validate().unwrap_err();
            assert!(
                err.to_string().contains(field),
                "error for {field} was: {err}"
            );
        }
    }

    #[test]
    fn test_invalid_config_returns_clear_error() {
        let result = NodeloadConfig::load("/nonexistent/path/nodeload.yaml");
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));
        assert!(err.to_string().contains("not found"));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: syntax: [").unwrap();

        let err = NodeloadConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Load(_)));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = NodeloadConfig::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.loader.max_batch_size, MAX_BATCH_SIZE);
        assert_eq!(config.loader.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(config.storage.backend, "memory");
        assert!(config.storage.fixtures_path.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert!(!config.logging.spans);
        assert!(config.metrics.enabled);
    }

    #[test]
    #[serial]
    fn test_from_env_loads_defaults_with_env_overrides() {
        std::env::set_var("NODELOAD_STORAGE__FIXTURES_PATH", "/tmp/fixtures.json");

        let config = NodeloadConfig::from_env();

        std::env::remove_var("NODELOAD_STORAGE__FIXTURES_PATH");

        let config = config.unwrap();
        assert_eq!(
            config.storage.fixtures_path.as_deref(),
            Some("/tmp/fixtures.json")
        );
        assert_eq!(config.loader.max_batch_size, MAX_BATCH_SIZE);
    }
}
