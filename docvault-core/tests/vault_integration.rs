//! End-to-end vault behaviour over the on-disk adapters.

mod common;

use std::fs;
use std::sync::Arc;

use docvault_core::blob::HttpBlobBackend;
use docvault_core::events::{MemoryEventSink, VaultAction};
use docvault_core::keys::{MasterKey, MasterKeyProtector};
use docvault_core::metadata::SqliteMetadataStore;
use docvault_core::{DocumentVault, VaultConfig, VaultError};

use common::{master_protector, open_disk_vault, plain_protector, upload_meta};

const LETTER: &[u8] = b"Dear client, this letter confirms our engagement. Privileged.";

#[test]
fn test_documents_survive_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let record = {
        let disk = open_disk_vault(dir.path(), master_protector());
        disk.vault
            .upload(LETTER, upload_meta("firm-1").with_client("client-42"))
            .expect("upload")
    };

    let disk = open_disk_vault(dir.path(), master_protector());
    let fetched = disk
        .vault
        .get_metadata(&record.id, "firm-1")
        .expect("metadata");
    assert_eq!(fetched, record);
    assert_eq!(fetched.client_id.as_deref(), Some("client-42"));

    let document = disk
        .vault
        .download(&record.id, "firm-1", "paralegal-7")
        .expect("download");
    assert_eq!(document.bytes, LETTER);
    assert_eq!(document.mime_type, "application/pdf");
    assert_eq!(document.original_name, "engagement-letter.pdf");

    let events = disk.events.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, VaultAction::Download);
    assert_eq!(events[0].user_id, "paralegal-7");
}

#[test]
fn test_blob_on_disk_is_ciphertext() {
    let dir = tempfile::tempdir().expect("tempdir");
    let disk = open_disk_vault(dir.path(), plain_protector());
    let record = disk.vault.upload(LETTER, upload_meta("firm-1")).expect("upload");

    let path = record
        .storage_key
        .split('/')
        .fold(disk.blobs.root().to_path_buf(), |path, segment| path.join(segment));
    let stored = fs::read(&path).expect("blob file");
    assert_eq!(stored.len() % 16, 0);
    assert!(stored.len() > LETTER.len());
    assert!(!stored.windows(6).any(|window| window == b"client"));
}

#[test]
fn test_tampered_file_is_never_served() {
    let dir = tempfile::tempdir().expect("tempdir");
    let disk = open_disk_vault(dir.path(), master_protector());
    let record = disk.vault.upload(LETTER, upload_meta("firm-1")).expect("upload");

    let path = record
        .storage_key
        .split('/')
        .fold(disk.blobs.root().to_path_buf(), |path, segment| path.join(segment));
    let mut bytes = fs::read(&path).expect("blob file");
    bytes[3] ^= 0x40;
    fs::write(&path, &bytes).expect("tamper");

    let err = disk
        .vault
        .download(&record.id, "firm-1", "attorney-1")
        .expect_err("tampered");
    assert!(err.is_consistency_violation(), "unexpected error: {err}");
}

#[test]
fn test_wrong_master_key_cannot_open_documents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let record = open_disk_vault(dir.path(), master_protector())
        .vault
        .upload(LETTER, upload_meta("firm-1"))
        .expect("upload");

    let other = Arc::new(MasterKeyProtector::new(MasterKey::generate()));
    let disk = open_disk_vault(dir.path(), other);
    match disk.vault.download(&record.id, "firm-1", "attorney-1") {
        Err(err @ VaultError::KeyUnavailable(_)) => assert!(!err.is_consistency_violation()),
        other => panic!("unexpected result: {other:?}"),
    }

    let plain = open_disk_vault(dir.path(), plain_protector());
    match plain.vault.download(&record.id, "firm-1", "attorney-1") {
        Err(VaultError::KeyUnavailable(_)) => {}
        other => panic!("unexpected result: {other:?}"),
    }

    let document = open_disk_vault(dir.path(), master_protector())
        .vault
        .download(&record.id, "firm-1", "attorney-1")
        .expect("original master key still opens the document");
    assert_eq!(document.bytes, LETTER);
}

#[test]
fn test_plain_records_readable_after_enabling_master_key() {
    let dir = tempfile::tempdir().expect("tempdir");
    let record = open_disk_vault(dir.path(), plain_protector())
        .vault
        .upload(LETTER, upload_meta("firm-1"))
        .expect("upload");

    let disk = open_disk_vault(dir.path(), master_protector());
    let document = disk
        .vault
        .download(&record.id, "firm-1", "attorney-1")
        .expect("download");
    assert_eq!(document.bytes, LETTER);
}

#[test]
fn test_delete_removes_file_and_stays_deleted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let record = {
        let disk = open_disk_vault(dir.path(), master_protector());
        let record = disk.vault.upload(LETTER, upload_meta("firm-1")).expect("upload");
        disk.vault
            .delete(&record.id, "firm-1", "attorney-1")
            .expect("delete");
        assert_eq!(disk.vault.stats().orphaned_blobs(), 0);
        record
    };

    let disk = open_disk_vault(dir.path(), master_protector());
    let path = record
        .storage_key
        .split('/')
        .fold(disk.blobs.root().to_path_buf(), |path, segment| path.join(segment));
    assert!(!path.exists());
    match disk.vault.get_metadata(&record.id, "firm-1") {
        Err(VaultError::DocumentNotFound) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_tenants_are_isolated_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let disk = open_disk_vault(dir.path(), master_protector());
    let a = disk.vault.upload(LETTER, upload_meta("firm-1")).expect("upload a");
    let b = disk.vault.upload(b"other firm", upload_meta("firm-2")).expect("upload b");

    match disk.vault.download(&a.id, "firm-2", "attorney-9") {
        Err(VaultError::DocumentNotFound) => {}
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(
        disk.vault
            .download(&b.id, "firm-2", "attorney-9")
            .expect("download")
            .bytes,
        b"other firm"
    );
}

#[test]
fn test_http_outage_leaves_no_record() {
    let mut server = mockito::Server::new();
    let _put = server
        .mock("PUT", mockito::Matcher::Regex("^/documents/.*".to_string()))
        .with_status(503)
        .create();

    let metadata = Arc::new(SqliteMetadataStore::open_in_memory().expect("metadata"));
    let vault = DocumentVault::new(
        Arc::new(HttpBlobBackend::new(&server.url()).expect("http backend")),
        metadata,
        Arc::new(MemoryEventSink::new()),
        plain_protector(),
        VaultConfig::default(),
    )
    .expect("vault");

    let err = vault
        .upload(LETTER, upload_meta("firm-1"))
        .expect_err("outage");
    assert!(err.is_retryable(), "unexpected error: {err}");
}

#[test]
fn test_http_upload_uses_prefix_and_token() {
    let mut server = mockito::Server::new();
    let put = server
        .mock("PUT", mockito::Matcher::Regex("^/matters/[0-9]+-[0-9a-f]{16}$".to_string()))
        .match_header("content-type", "application/pdf")
        .match_header("authorization", "Bearer token-1")
        .with_status(201)
        .create();

    let config = VaultConfig {
        storage_key_prefix: "matters".to_string(),
        ..VaultConfig::default()
    };
    let vault = DocumentVault::new(
        Arc::new(
            HttpBlobBackend::new(&server.url())
                .expect("http backend")
                .with_token("token-1"),
        ),
        Arc::new(SqliteMetadataStore::open_in_memory().expect("metadata")),
        Arc::new(MemoryEventSink::new()),
        master_protector(),
        config,
    )
    .expect("vault");

    let record = vault.upload(LETTER, upload_meta("firm-1")).expect("upload");
    put.assert();
    assert!(record.storage_key.starts_with("matters/"));
}
