use std::time::Instant;

use super::*;
use crate::test_support::{legacy_document, sample_document};
use crate::KeyProtection;

fn temp_store() -> (tempfile::TempDir, SqliteMetadataStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteMetadataStore::open(&dir.path().join("metadata.sqlite")).expect("open store");
    (dir, store)
}

#[test]
fn test_create_and_find_round_trips_every_column() {
    let (_dir, store) = temp_store();
    let doc = sample_document("tenant-a", "documents/1-a");
    store.create(doc.clone(), Deadline::unbounded()).expect("create");

    let found = store
        .find_by_id(&doc.record.id, "tenant-a", Deadline::unbounded())
        .expect("find")
        .expect("present");
    assert_eq!(found, doc);
}

#[test]
fn test_reopen_keeps_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("metadata.sqlite");
    let doc = sample_document("tenant-a", "documents/1-a");
    {
        let store = SqliteMetadataStore::open(&path).expect("open store");
        store.create(doc.clone(), Deadline::unbounded()).expect("create");
    }
    let store = SqliteMetadataStore::open(&path).expect("reopen store");
    assert!(store
        .find_by_id(&doc.record.id, "tenant-a", Deadline::unbounded())
        .expect("find")
        .is_some());
}

#[test]
fn test_other_tenant_sees_nothing() {
    let store = SqliteMetadataStore::open_in_memory().expect("open store");
    let doc = sample_document("tenant-a", "documents/1-a");
    store.create(doc.clone(), Deadline::unbounded()).expect("create");
    assert!(store
        .find_by_id(&doc.record.id, "tenant-b", Deadline::unbounded())
        .expect("find")
        .is_none());
    assert!(!store
        .mark_deleted(&doc.record.id, "tenant-b", 10, Deadline::unbounded())
        .expect("mark"));
}

#[test]
fn test_duplicate_storage_key() {
    let store = SqliteMetadataStore::open_in_memory().expect("open store");
    store
        .create(sample_document("tenant-a", "documents/1-a"), Deadline::unbounded())
        .expect("create");
    let err = store
        .create(sample_document("tenant-b", "documents/1-a"), Deadline::unbounded())
        .expect_err("duplicate key");
    match err {
        MetadataError::DuplicateStorageKey { storage_key } => {
            assert_eq!(storage_key, "documents/1-a");
        }
        _ => panic!("unexpected error: {err}"),
    }
}

#[test]
fn test_duplicate_id_is_not_a_key_collision() {
    let store = SqliteMetadataStore::open_in_memory().expect("open store");
    let doc = sample_document("tenant-a", "documents/1-a");
    store.create(doc.clone(), Deadline::unbounded()).expect("create");
    let mut again = doc;
    again.record.storage_key = "documents/2-b".to_string();
    let err = store.create(again, Deadline::unbounded()).expect_err("duplicate id");
    match err {
        MetadataError::Db(_) => {}
        _ => panic!("unexpected error: {err}"),
    }
}

#[test]
fn test_mark_deleted_is_final_and_idempotent() {
    let store = SqliteMetadataStore::open_in_memory().expect("open store");
    let doc = sample_document("tenant-a", "documents/1-a");
    let id = doc.record.id;
    store.create(doc, Deadline::unbounded()).expect("create");

    assert!(store.mark_deleted(&id, "tenant-a", 42, Deadline::unbounded()).expect("mark"));
    assert!(!store.mark_deleted(&id, "tenant-a", 43, Deadline::unbounded()).expect("mark again"));
    assert!(store
        .find_by_id(&id, "tenant-a", Deadline::unbounded())
        .expect("find")
        .is_none());

    let conn = store.conn.lock().expect("lock");
    let deleted_at: i64 = conn
        .query_row(
            "SELECT deleted_at FROM documents WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )
        .expect("query");
    assert_eq!(deleted_at, 42);
}

#[test]
fn test_legacy_rows_have_no_key() {
    let store = SqliteMetadataStore::open_in_memory().expect("open store");
    let doc = legacy_document("tenant-a", "legacy/1");
    store.create(doc.clone(), Deadline::unbounded()).expect("create");
    let found = store
        .find_by_id(&doc.record.id, "tenant-a", Deadline::unbounded())
        .expect("find")
        .expect("present");
    assert!(!found.record.is_encrypted);
    assert!(found.key.is_none());
    assert!(found.record.content_hash.is_none());
}

#[test]
fn test_wrapped_protection_round_trips() {
    let store = SqliteMetadataStore::open_in_memory().expect("open store");
    let mut doc = sample_document("tenant-a", "documents/1-a");
    if let Some(key) = doc.key.as_mut() {
        key.protection = KeyProtection::Wrapped;
        key.encryption_key = zeroize::Zeroizing::new(vec![7u8; 73]);
    }
    store.create(doc.clone(), Deadline::unbounded()).expect("create");
    let found = store
        .find_by_id(&doc.record.id, "tenant-a", Deadline::unbounded())
        .expect("find")
        .expect("present");
    let key = found.key.expect("key");
    assert_eq!(key.protection, KeyProtection::Wrapped);
    assert_eq!(key.encryption_key.len(), 73);
}

#[test]
fn test_check_constraint_rejects_encrypted_row_without_key() {
    let store = SqliteMetadataStore::open_in_memory().expect("open store");
    let conn = store.conn.lock().expect("lock");
    let result = conn.execute(
        "INSERT INTO documents (id, tenant_id, storage_key, original_name, mime_type,
            size_bytes, is_encrypted, owner_user_id, created_at)
         VALUES ('x', 't', 'k', 'n', 'm', 1, 1, 'u', 1)",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn test_corrupt_row_is_reported() {
    let store = SqliteMetadataStore::open_in_memory().expect("open store");
    let doc = sample_document("tenant-a", "documents/1-a");
    let id = doc.record.id;
    store.create(doc, Deadline::unbounded()).expect("create");
    store
        .conn
        .lock()
        .expect("lock")
        .execute(
            "UPDATE documents SET encryption_iv = X'0011' WHERE id = ?1",
            params![id.to_string()],
        )
        .expect("tamper");

    let err = store
        .find_by_id(&id, "tenant-a", Deadline::unbounded())
        .expect_err("corrupt iv");
    match err {
        MetadataError::Corrupt(_) => {}
        _ => panic!("unexpected error: {err}"),
    }
}

#[test]
fn test_expired_deadline_times_out() {
    let store = SqliteMetadataStore::open_in_memory().expect("open store");
    let err = store
        .find_by_id(&DocumentId::generate(), "tenant-a", Deadline::at(Instant::now()))
        .expect_err("expired");
    match err {
        MetadataError::Timeout => {}
        _ => panic!("unexpected error: {err}"),
    }
}

#[test]
fn test_schema_version_recorded_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("metadata.sqlite");
    drop(SqliteMetadataStore::open(&path).expect("open"));
    let store = SqliteMetadataStore::open(&path).expect("reopen");
    let conn = store.conn.lock().expect("lock");
    let (count, version): (i64, i64) = conn
        .query_row(
            "SELECT COUNT(*), MAX(schema_version) FROM vault_meta",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("query");
    assert_eq!(count, 1);
    assert_eq!(version, schema::VAULT_SCHEMA_VERSION);
}

#[test]
fn test_newer_schema_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("metadata.sqlite");
    {
        let store = SqliteMetadataStore::open(&path).expect("open");
        store
            .conn
            .lock()
            .expect("lock")
            .execute("UPDATE vault_meta SET schema_version = 99", [])
            .expect("bump");
    }
    let err = SqliteMetadataStore::open(&path).expect_err("newer schema");
    match err {
        MetadataError::Db(message) => assert!(message.contains("99")),
        _ => panic!("unexpected error: {err}"),
    }
}
