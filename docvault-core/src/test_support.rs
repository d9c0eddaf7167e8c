//! Shared fixtures for unit tests.

use zeroize::Zeroizing;

use crate::crypto::{generate_iv, generate_key, hash};
use crate::{DocumentId, DocumentRecord, KeyProtection, StoredDocument, StoredKey};

pub(crate) fn sample_document(tenant_id: &str, storage_key: &str) -> StoredDocument {
    let plaintext = b"hello-doc!";
    StoredDocument {
        record: DocumentRecord {
            id: DocumentId::generate(),
            storage_key: storage_key.to_string(),
            original_name: "hello.txt".to_string(),
            mime_type: "text/plain".to_string(),
            size_bytes: plaintext.len() as u64,
            content_hash: Some(hash(plaintext)),
            is_encrypted: true,
            tenant_id: tenant_id.to_string(),
            owner_user_id: "user-1".to_string(),
            case_id: Some("case-7".to_string()),
            client_id: None,
            created_at: 1_700_000_000_000,
        },
        key: Some(StoredKey {
            protection: KeyProtection::Plain,
            encryption_key: Zeroizing::new(generate_key().as_bytes().to_vec()),
            encryption_iv: generate_iv(),
        }),
        deleted_at: None,
    }
}

pub(crate) fn legacy_document(tenant_id: &str, storage_key: &str) -> StoredDocument {
    let mut document = sample_document(tenant_id, storage_key);
    document.record.is_encrypted = false;
    document.record.content_hash = None;
    document.key = None;
    document
}
