use thiserror::Error;

use crate::blob::BlobError;
use crate::crypto::CryptoError;
use crate::metadata::MetadataError;
use crate::ConfigError;

/// Result type for vault operations.
pub type VaultResult<T, E = VaultError> = std::result::Result<T, E>;

/// Errors surfaced by [`crate::DocumentVault`] operations.
///
/// Input errors are raised before any I/O. Consistency errors mean the blob and
/// its metadata diverged and must never be treated as success. Transient
/// backend errors can be retried by the caller, see [`VaultError::is_retryable`].
#[derive(Debug, Error)]
pub enum VaultError {
    /// The upload payload was empty.
    #[error("empty_payload")]
    EmptyPayload,

    /// The upload payload exceeded the configured maximum size.
    #[error("payload_too_large: {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge {
        /// Size of the rejected payload.
        size: u64,
        /// Configured ceiling.
        max: u64,
    },

    /// No active document with this id exists in the tenant.
    #[error("document_not_found")]
    DocumentNotFound,

    /// The record predates encryption and cannot be served by the vault.
    #[error("unsupported_legacy_format")]
    UnsupportedLegacyFormat,

    /// Metadata exists but the stored blob is missing or undecryptable.
    #[error("document_corrupted: {0}")]
    DocumentCorrupted(String),

    /// The stored document key cannot be opened with the configured key
    /// protector: a different master key, no master key for a wrapped record,
    /// or a tampered wrapped key.
    #[error("key_unavailable: {0}")]
    KeyUnavailable(String),

    /// The decrypted plaintext does not match the recorded content hash.
    #[error("integrity_check_failed")]
    IntegrityCheckFailed,

    /// Every generated storage key collided with an existing object.
    #[error("storage_key_exhausted after {attempts} attempts")]
    StorageKeyExhausted {
        /// Number of keys tried.
        attempts: u32,
    },

    /// Blob backend failure.
    #[error(transparent)]
    Blob(#[from] BlobError),

    /// Metadata store failure.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Cryptographic failure outside the download path.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The vault was constructed with an invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl VaultError {
    /// Returns `true` for transient backend failures that are safe to retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Blob(err) => err.is_retryable(),
            Self::Metadata(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Returns `true` when the blob and its metadata have diverged.
    #[must_use]
    pub const fn is_consistency_violation(&self) -> bool {
        matches!(self, Self::DocumentCorrupted(_) | Self::IntegrityCheckFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(VaultError::Blob(BlobError::Unavailable("reset".to_string())).is_retryable());
        assert!(VaultError::Metadata(MetadataError::Timeout).is_retryable());
        assert!(!VaultError::Blob(BlobError::NotFound {
            key: "documents/1-a".to_string()
        })
        .is_retryable());
        assert!(!VaultError::DocumentNotFound.is_retryable());
        assert!(!VaultError::IntegrityCheckFailed.is_retryable());
    }

    #[test]
    fn test_consistency_classification() {
        assert!(VaultError::IntegrityCheckFailed.is_consistency_violation());
        assert!(VaultError::DocumentCorrupted("blob missing".to_string())
            .is_consistency_violation());
        assert!(!VaultError::DocumentNotFound.is_consistency_violation());
        assert!(!VaultError::KeyUnavailable("wrong master key".to_string())
            .is_consistency_violation());
        assert!(!VaultError::KeyUnavailable("wrong master key".to_string()).is_retryable());
    }

    #[test]
    fn test_display_is_stable() {
        let err = VaultError::PayloadTooLarge { size: 11, max: 10 };
        assert_eq!(
            err.to_string(),
            "payload_too_large: 11 bytes exceeds the 10 byte limit"
        );
    }
}
