#![allow(dead_code, missing_docs)]

//! Common test utilities shared across integration tests.

use std::path::Path;
use std::sync::Arc;

use docvault_core::blob::FsBlobBackend;
use docvault_core::events::MemoryEventSink;
use docvault_core::keys::{KeyProtector, MasterKey, MasterKeyProtector, PlainKeyProtector};
use docvault_core::metadata::SqliteMetadataStore;
use docvault_core::{DocumentVault, UploadMeta, VaultConfig};

pub const MASTER_KEY_HEX: &str =
    "8f2c1d0e4b5a69788796a5b4c3d2e1f00f1e2d3c4b5a69788796a5b4c3d2e1f0";

pub struct DiskVault {
    pub vault: DocumentVault,
    pub blobs: Arc<FsBlobBackend>,
    pub events: Arc<MemoryEventSink>,
}

pub fn master_protector() -> Arc<dyn KeyProtector> {
    let master = MasterKey::from_hex(MASTER_KEY_HEX).expect("master key");
    Arc::new(MasterKeyProtector::new(master))
}

pub fn plain_protector() -> Arc<dyn KeyProtector> {
    Arc::new(PlainKeyProtector)
}

/// Opens a vault over `SQLite` and filesystem blobs rooted at `dir`.
///
/// Opening twice over the same directory sees the same documents.
pub fn open_disk_vault(dir: &Path, keys: Arc<dyn KeyProtector>) -> DiskVault {
    let blobs = Arc::new(FsBlobBackend::new(dir.join("blobs")).expect("blob backend"));
    let metadata =
        Arc::new(SqliteMetadataStore::open(&dir.join("metadata.sqlite")).expect("metadata store"));
    let events = Arc::new(MemoryEventSink::new());
    let vault = DocumentVault::new(
        blobs.clone(),
        metadata,
        events.clone(),
        keys,
        VaultConfig::default(),
    )
    .expect("vault");
    DiskVault {
        vault,
        blobs,
        events,
    }
}

pub fn upload_meta(tenant_id: &str) -> UploadMeta {
    UploadMeta::new("engagement-letter.pdf", "application/pdf", tenant_id, "attorney-1")
}
