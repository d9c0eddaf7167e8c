//! Metadata store adapters.
//!
//! The store persists one [`StoredDocument`] per upload, scoped by tenant.
//! Reads never return soft-deleted rows or rows belonging to another tenant.

mod memory;
mod sqlite;

pub use memory::MemoryMetadataStore;
pub use sqlite::SqliteMetadataStore;

use thiserror::Error;

use crate::{Deadline, DocumentId, StoredDocument};

/// Result type for metadata store operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Errors raised by metadata stores.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Another record already uses this storage key.
    #[error("duplicate storage key: {storage_key}")]
    DuplicateStorageKey {
        /// Conflicting storage key.
        storage_key: String,
    },

    /// The store is busy, locked or unreachable.
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete before its deadline.
    #[error("metadata store timed out")]
    Timeout,

    /// A stored row could not be decoded.
    #[error("corrupt metadata row: {0}")]
    Corrupt(String),

    /// Any other database failure.
    #[error("metadata store error: {0}")]
    Db(String),
}

impl MetadataError {
    /// Returns `true` for transient failures the caller may retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }
}

/// Tenant-scoped persistence for document records.
pub trait MetadataStore: Send + Sync {
    /// Inserts a new record and returns it as stored.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::DuplicateStorageKey`] when the storage key is
    /// already taken, or a store error.
    fn create(&self, document: StoredDocument, deadline: Deadline) -> MetadataResult<StoredDocument>;

    /// Looks up an active record of `tenant_id`.
    ///
    /// Returns `None` when the id is unknown, belongs to another tenant, or
    /// has been soft-deleted.
    ///
    /// # Errors
    ///
    /// Returns a store error, or [`MetadataError::Corrupt`] for undecodable rows.
    fn find_by_id(
        &self,
        id: &DocumentId,
        tenant_id: &str,
        deadline: Deadline,
    ) -> MetadataResult<Option<StoredDocument>>;

    /// Soft-deletes a record of `tenant_id`.
    ///
    /// Returns `true` if an active record was marked, `false` if there was
    /// nothing to mark. Calling it again is harmless.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    fn mark_deleted(
        &self,
        id: &DocumentId,
        tenant_id: &str,
        now: u64,
        deadline: Deadline,
    ) -> MetadataResult<bool>;
}

pub(crate) fn check_deadline(deadline: Deadline) -> MetadataResult<()> {
    if deadline.is_expired() {
        return Err(MetadataError::Timeout);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(MetadataError::Timeout.is_retryable());
        assert!(MetadataError::Unavailable("busy".to_string()).is_retryable());
        assert!(!MetadataError::DuplicateStorageKey {
            storage_key: "documents/1-a".to_string()
        }
        .is_retryable());
        assert!(!MetadataError::Corrupt("bad iv".to_string()).is_retryable());
    }
}
