#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! Encrypted document vault.
//!
//! Every uploaded document is encrypted with its own AES-256-CBC key and IV,
//! written to a blob backend under a generated storage key, and recorded in a
//! tenant-scoped metadata store together with the SHA-256 of its plaintext.
//! Downloads decrypt the blob and refuse to return bytes whose hash no longer
//! matches the record.
//!
//! The [`DocumentVault`] orchestrates the pipeline; storage and audit
//! collaborators are injected through the [`BlobBackend`], [`MetadataStore`],
//! [`EventSink`] and [`KeyProtector`] traits.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use docvault_core::blob::MemoryBlobBackend;
//! use docvault_core::events::NoopEventSink;
//! use docvault_core::keys::PlainKeyProtector;
//! use docvault_core::metadata::MemoryMetadataStore;
//! use docvault_core::{DocumentVault, UploadMeta, VaultConfig};
//!
//! # fn main() -> Result<(), docvault_core::VaultError> {
//! let vault = DocumentVault::new(
//!     Arc::new(MemoryBlobBackend::new()),
//!     Arc::new(MemoryMetadataStore::new()),
//!     Arc::new(NoopEventSink),
//!     Arc::new(PlainKeyProtector),
//!     VaultConfig::default(),
//! )?;
//!
//! let meta = UploadMeta::new("engagement.txt", "text/plain", "tenant-a", "user-1");
//! let record = vault.upload(b"hello-doc!", meta)?;
//! let document = vault.download(&record.id, "tenant-a", "user-1")?;
//! assert_eq!(document.bytes, b"hello-doc!");
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod crypto;
pub mod events;
pub mod keys;
pub mod metadata;

mod config;
pub use config::*;

mod deadline;
pub use deadline::Deadline;

mod error;
pub use error::*;

mod types;
pub use types::*;

mod vault;
pub use vault::{DocumentVault, VaultStats};

#[cfg(test)]
mod test_support;

pub use blob::BlobBackend;
pub use events::EventSink;
pub use keys::KeyProtector;
pub use metadata::MetadataStore;

/// Current time as unix milliseconds.
pub(crate) fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| {
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
        })
}
