//! Store configuration.
//!
//! A [`StoreConfig`] says where the database file lives and how the embedded
//! store is tuned. It can be built in code or loaded from a JSON file:
//!
//! ```json
//! {
//!   "path": "data/main.db",
//!   "create_dirs": true,
//!   "cache_size_bytes": 67108864
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default page cache size for the embedded store (64 MiB).
pub const DEFAULT_CACHE_SIZE_BYTES: usize = 64 * 1024 * 1024;

/// Configuration for opening a [`crate::Store`].
///
/// # Example
///
/// ```rust
/// use harvestdb::StoreConfig;
///
/// let config = StoreConfig::new("data/main.db");
/// assert!(config.create_dirs);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the database file.
    pub path: PathBuf,

    /// Create the parent directory of `path` if it does not exist.
    #[serde(default = "default_create_dirs")]
    pub create_dirs: bool,

    /// Page cache size handed to the embedded store.
    #[serde(default = "default_cache_size")]
    pub cache_size_bytes: usize,
}

fn default_create_dirs() -> bool {
    true
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE_BYTES
}

impl StoreConfig {
    /// Creates a configuration for the database file at `path` with default
    /// settings.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            create_dirs: default_create_dirs(),
            cache_size_bytes: default_cache_size(),
        }
    }

    /// Loads and validates a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is not valid JSON for this type, and
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;

        let config: StoreConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                source: e,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the path is empty or names a
    /// directory, or if the cache size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                reason: "database path cannot be empty".to_string(),
            }
            .into());
        }

        if self.path.is_dir() {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "database path '{}' is a directory, expected a file",
                    self.path.display()
                ),
            }
            .into());
        }

        if self.cache_size_bytes == 0 {
            return Err(ConfigError::Invalid {
                reason: "cache_size_bytes must be > 0".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
