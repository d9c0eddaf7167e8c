//! Blob backend adapters.
//!
//! A blob backend stores opaque ciphertext under a storage key chosen by the
//! vault. It knows nothing about encryption or tenants.
//!
//! - [`MemoryBlobBackend`]: in-process map, for tests and embedding
//! - [`FsBlobBackend`]: files under a root directory, written atomically
//! - [`HttpBlobBackend`]: remote content-storage service over HTTP

mod fs;
mod http;
mod memory;

pub use fs::FsBlobBackend;
pub use http::HttpBlobBackend;
pub use memory::MemoryBlobBackend;

use std::fmt;

use thiserror::Error;

use crate::Deadline;

/// Result type for blob backend operations.
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors raised by blob backends.
#[derive(Debug, Error)]
pub enum BlobError {
    /// No object exists under the key.
    #[error("blob not found: {key}")]
    NotFound {
        /// Requested storage key.
        key: String,
    },

    /// An object already exists under the key and the backend does not overwrite.
    #[error("blob already exists: {key}")]
    AlreadyExists {
        /// Conflicting storage key.
        key: String,
    },

    /// The storage key is not acceptable as an object name.
    #[error("invalid storage key {key:?}: {reason}")]
    InvalidKey {
        /// Rejected storage key.
        key: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The backend could not be reached or failed transiently.
    #[error("blob backend unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete before its deadline.
    #[error("blob backend timed out on {key}")]
    Timeout {
        /// Storage key of the timed-out call.
        key: String,
    },

    /// Any other backend failure.
    #[error("blob backend error: {0}")]
    Backend(String),
}

impl BlobError {
    /// Returns `true` for transport failures the caller may retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

/// What a backend does when asked to write a key that already holds an object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WritePolicy {
    /// Fail with [`BlobError::AlreadyExists`].
    #[default]
    RejectExisting,
    /// Replace the existing object.
    Overwrite,
}

/// Address of a stored object, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocation {
    /// Storage key the object was written under.
    pub key: String,
    /// Backend-specific locator (file path or URL).
    pub url: String,
}

impl fmt::Display for BlobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Content-storage service holding encrypted document bodies.
///
/// Calls are blocking. Implementations must honour `deadline` and must never
/// return one key's bytes for another key.
pub trait BlobBackend: Send + Sync {
    /// Stores `data` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::AlreadyExists`] when the key is taken and the backend
    /// does not overwrite, or a transport error.
    fn put(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
        deadline: Deadline,
    ) -> BlobResult<BlobLocation>;

    /// Fetches the object stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::NotFound`] if there is no object, or a transport error.
    fn get(&self, key: &str, deadline: Deadline) -> BlobResult<Vec<u8>>;

    /// Removes the object stored under `key`. Missing objects are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error only for actual backend failures.
    fn delete(&self, key: &str, deadline: Deadline) -> BlobResult<()>;

    /// Behaviour of [`BlobBackend::put`] for an occupied key.
    fn write_policy(&self) -> WritePolicy;
}

/// Checks that `key` is usable as an object name on every backend.
///
/// # Errors
///
/// Returns [`BlobError::InvalidKey`] for empty keys, absolute paths, `..` or
/// empty segments, and characters outside `[A-Za-z0-9._/-]`.
pub fn validate_storage_key(key: &str) -> BlobResult<()> {
    let invalid = |reason| {
        Err(BlobError::InvalidKey {
            key: key.to_string(),
            reason,
        })
    };
    if key.is_empty() {
        return invalid("empty");
    }
    if key.starts_with('/') {
        return invalid("absolute path");
    }
    if !key
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'/' | b'-'))
    {
        return invalid("unsupported character");
    }
    if key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
        return invalid("empty or relative segment");
    }
    Ok(())
}

pub(crate) fn check_deadline(key: &str, deadline: Deadline) -> BlobResult<()> {
    if deadline.is_expired() {
        return Err(BlobError::Timeout {
            key: key.to_string(),
        });
    }
    Ok(())
}
