pub mod loader;
pub mod local_backend;
pub mod retry;

#[cfg(test)]
mod testutil;

use serde::{Deserialize, Serialize};

use packread_types::error::Result;

pub use loader::{BackendLoader, RangeLoader};
pub use local_backend::LocalBackend;

/// Read access to an object store holding repository files under
/// `/`-separated keys.
pub trait StorageBackend: Send + Sync {
    /// List object keys under `prefix`.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Read `length` bytes starting at `offset`. `Ok(None)` if the object does
    /// not exist. May return fewer bytes than requested when the object is
    /// shorter; callers decide whether a short read is an error.
    fn get_range(&self, key: &str, offset: u64, length: u64) -> Result<Option<Vec<u8>>>;
}

/// Retry policy for range reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first read (0 = no retries).
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Initial delay between retries in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

fn default_max_retries() -> usize {
    1
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    5_000
}
