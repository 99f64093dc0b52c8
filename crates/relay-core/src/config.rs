use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("batcher.max_elements must be >= 1, got {0}")]
    InvalidMaxElements(u64),
    #[error("batcher.max_size must be >= 1, got {0}")]
    InvalidMaxSize(u64),
    #[error("batcher.max_time_seconds must be > 0, got {0}")]
    InvalidMaxTimeSeconds(f64),
}

/// Flush-policy thresholds for the Batcher. The only recognized options.
/// A configuration outside these bounds is rejected at startup rather than
/// silently clamped.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatcherConfig {
    pub max_elements: u64,
    pub max_size: u64,
    pub max_time_seconds: f64,
}

impl BatcherConfig {
    pub fn new(max_elements: u64, max_size: u64, max_time_seconds: f64) -> Result<Self, ConfigError> {
        let cfg = Self {
            max_elements,
            max_size,
            max_time_seconds,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_elements < 1 {
            return Err(ConfigError::InvalidMaxElements(self.max_elements));
        }
        if self.max_size < 1 {
            return Err(ConfigError::InvalidMaxSize(self.max_size));
        }
        if !(self.max_time_seconds > 0.0) {
            return Err(ConfigError::InvalidMaxTimeSeconds(self.max_time_seconds));
        }
        Ok(())
    }
}

impl Default for BatcherConfig {
    /// Mirrors the common defaults used when no override is configured:
    /// small batches, a 30KB cap, a 5 second maximum hold time.
    fn default() -> Self {
        Self {
            max_elements: 5,
            max_size: 30_000,
            max_time_seconds: 5.0,
        }
    }
}
