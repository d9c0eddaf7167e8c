use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default upload ceiling (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Default number of storage keys tried before an upload gives up.
pub const DEFAULT_STORAGE_KEY_ATTEMPTS: u32 = 5;

/// Default deadline applied to each vault operation.
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 30_000;

/// Default first path segment of generated storage keys.
pub const DEFAULT_STORAGE_KEY_PREFIX: &str = "documents";

/// Errors raised while loading or validating a [`VaultConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`VaultConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the vault cannot operate with.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Policy knobs for [`crate::DocumentVault`].
///
/// Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Largest accepted plaintext, in bytes.
    pub max_upload_bytes: u64,
    /// Total storage keys tried per upload before `StorageKeyExhausted`.
    pub storage_key_attempts: u32,
    /// Deadline applied to each operation that does not carry its own.
    pub operation_timeout_ms: u64,
    /// First path segment of generated storage keys.
    pub storage_key_prefix: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            storage_key_attempts: DEFAULT_STORAGE_KEY_ATTEMPTS,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            storage_key_prefix: DEFAULT_STORAGE_KEY_PREFIX.to_string(),
        }
    }
}

impl VaultConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Parses a configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every field is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_upload_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.storage_key_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "storage_key_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.operation_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "operation_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        let prefix = &self.storage_key_prefix;
        if prefix.is_empty()
            || !prefix
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(ConfigError::Invalid {
                field: "storage_key_prefix",
                reason: format!("{prefix:?} must be non-empty [A-Za-z0-9_-]"),
            });
        }
        Ok(())
    }

    /// Deadline duration applied to each operation.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}
