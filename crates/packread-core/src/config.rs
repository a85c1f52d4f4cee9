use std::path::Path;

use serde::{Deserialize, Serialize};

use packread_storage::RetryConfig;
use packread_types::error::{PackreadError, Result};

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV_VAR: &str = "PACKREAD_CONFIG";

/// Upper bound on `max_coalesce_gap`.
const MAX_COALESCE_GAP_LIMIT: u64 = 64 * 1024 * 1024;

/// Tuning for pack streaming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Largest hole between two requested blobs that is read and discarded
    /// rather than split into a separate range request.
    #[serde(default = "default_max_coalesce_gap")]
    pub max_coalesce_gap: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_coalesce_gap: default_max_coalesce_gap(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_max_coalesce_gap() -> u64 {
    256 * 1024
}

impl StreamConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_coalesce_gap > MAX_COALESCE_GAP_LIMIT {
            return Err(PackreadError::Config(format!(
                "max_coalesce_gap must not exceed {MAX_COALESCE_GAP_LIMIT} bytes, got {}",
                self.max_coalesce_gap
            )));
        }
        if self.retry.retry_delay_ms > self.retry.retry_max_delay_ms {
            return Err(PackreadError::Config(format!(
                "retry.retry_delay_ms ({}) must not exceed retry.retry_max_delay_ms ({})",
                self.retry.retry_delay_ms, self.retry.retry_max_delay_ms
            )));
        }
        Ok(())
    }

    /// Parse and validate a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: StreamConfig = if contents.trim().is_empty() {
            StreamConfig::default()
        } else {
            serde_yaml::from_str(contents)
                .map_err(|e| PackreadError::Config(format!("invalid YAML: {e}")))?
        };
        config.validate()?;
        Ok(config)
    }
}

/// Load and validate a stream config file.
pub fn load_config(path: &Path) -> Result<StreamConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        PackreadError::Config(format!("failed to read config '{}': {e}", path.display()))
    })?;
    StreamConfig::from_yaml_str(&contents)
}
