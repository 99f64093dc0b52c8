//! Layered configuration: built-in defaults, overridden by an optional
//! TOML file, overridden by environment variables. Validated before the
//! supervisor is allowed to start — a configuration that fails
//! validation aborts startup rather than running with degenerate limits.

use std::path::Path;

use relay_core::{BatcherConfig, ConfigError as BatcherConfigError};
use relay_indexer::IndexerConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid batcher configuration: {0}")]
    Batcher(#[from] BatcherConfigError),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub batcher: BatcherConfig,
    pub indexer: IndexerConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialBatcherConfig {
    max_elements: Option<u64>,
    max_size: Option<u64>,
    max_time_seconds: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialIndexerConfig {
    host: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialFileConfig {
    #[serde(default)]
    batcher: PartialBatcherConfig,
    #[serde(default)]
    indexer: PartialIndexerConfig,
}

impl AppConfig {
    /// Loads defaults, merges an optional TOML file at `path` (if it
    /// exists), then merges recognized environment variables, then
    /// validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                toml::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?
            }
            _ => PartialFileConfig::default(),
        };

        let defaults = BatcherConfig::default();
        let max_elements = env_u64("RELAY_BATCHER__MAX_ELEMENTS")
            .or(file.batcher.max_elements)
            .unwrap_or(defaults.max_elements);
        let max_size = env_u64("RELAY_BATCHER__MAX_SIZE")
            .or(file.batcher.max_size)
            .unwrap_or(defaults.max_size);
        let max_time_seconds = env_f64("RELAY_BATCHER__MAX_TIME_SECONDS")
            .or(file.batcher.max_time_seconds)
            .unwrap_or(defaults.max_time_seconds);
        let batcher = BatcherConfig::new(max_elements, max_size, max_time_seconds)?;

        let host = std::env::var("RELAY_INDEXER__HOST")
            .ok()
            .or(file.indexer.host)
            .unwrap_or_else(|| "http://localhost:9200".to_string());
        let user = std::env::var("RELAY_INDEXER__USER")
            .ok()
            .or(file.indexer.user)
            .unwrap_or_default();
        let password = std::env::var("RELAY_INDEXER__PASSWORD")
            .ok()
            .or(file.indexer.password)
            .unwrap_or_default();
        let indexer = IndexerConfig::new(host, user, password);

        Ok(Self { batcher, indexer })
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_configured() {
        // SAFETY-equivalent: tests run serially within a crate's test
        // binary by default, and these three keys are not used elsewhere.
        for key in [
            "RELAY_BATCHER__MAX_ELEMENTS",
            "RELAY_BATCHER__MAX_SIZE",
            "RELAY_BATCHER__MAX_TIME_SECONDS",
            "RELAY_INDEXER__HOST",
            "RELAY_INDEXER__USER",
            "RELAY_INDEXER__PASSWORD",
        ] {
            std::env::remove_var(key);
        }
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.batcher.max_elements, 5);
        assert_eq!(config.batcher.max_size, 30_000);
        assert_eq!(config.indexer.host, "http://localhost:9200");
    }

    #[test]
    fn env_vars_override_defaults() {
        std::env::set_var("RELAY_BATCHER__MAX_ELEMENTS", "42");
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.batcher.max_elements, 42);
        std::env::remove_var("RELAY_BATCHER__MAX_ELEMENTS");
    }

    #[test]
    fn invalid_merged_config_fails_validation() {
        std::env::set_var("RELAY_BATCHER__MAX_ELEMENTS", "0");
        let result = AppConfig::load(None);
        assert!(result.is_err());
        std::env::remove_var("RELAY_BATCHER__MAX_ELEMENTS");
    }
}
