use rusqlite::{ErrorCode, Row};
use zeroize::Zeroizing;

use crate::crypto::{ContentHash, DocumentIv};
use crate::metadata::{MetadataError, MetadataResult};
use crate::{DocumentId, DocumentRecord, KeyProtection, StoredDocument, StoredKey};

pub(super) const DOCUMENT_COLUMNS: &str = "id, tenant_id, storage_key, original_name, mime_type, \
     size_bytes, content_hash, is_encrypted, key_protection, encryption_key, encryption_iv, \
     owner_user_id, case_id, client_id, created_at, deleted_at";

pub(super) fn to_i64(value: u64, label: &str) -> MetadataResult<i64> {
    i64::try_from(value)
        .map_err(|_| MetadataError::Db(format!("{label} out of range for i64: {value}")))
}

pub(super) fn to_u64(value: i64, label: &str) -> MetadataResult<u64> {
    u64::try_from(value)
        .map_err(|_| MetadataError::Corrupt(format!("{label} out of range for u64: {value}")))
}

pub(super) fn map_db_err(err: &rusqlite::Error) -> MetadataError {
    match err {
        rusqlite::Error::SqliteFailure(code, _)
            if matches!(
                code.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ) =>
        {
            MetadataError::Unavailable(err.to_string())
        }
        _ => MetadataError::Db(err.to_string()),
    }
}

pub(super) fn map_insert_err(err: &rusqlite::Error, storage_key: &str) -> MetadataError {
    if let rusqlite::Error::SqliteFailure(code, Some(message)) = err {
        if code.code == ErrorCode::ConstraintViolation
            && message.contains("documents.storage_key")
        {
            return MetadataError::DuplicateStorageKey {
                storage_key: storage_key.to_string(),
            };
        }
    }
    map_db_err(err)
}

pub(super) fn map_document(row: &Row<'_>) -> MetadataResult<StoredDocument> {
    let get_err = |err: rusqlite::Error| map_db_err(&err);

    let id: String = row.get(0).map_err(get_err)?;
    let id: DocumentId = id
        .parse()
        .map_err(|err| MetadataError::Corrupt(format!("invalid document id {id:?}: {err}")))?;
    let size_bytes: i64 = row.get(5).map_err(get_err)?;
    let content_hash: Option<Vec<u8>> = row.get(6).map_err(get_err)?;
    let is_encrypted: bool = row.get(7).map_err(get_err)?;
    let key_protection: Option<i64> = row.get(8).map_err(get_err)?;
    let encryption_key: Option<Vec<u8>> = row.get(9).map_err(get_err)?;
    let encryption_iv: Option<Vec<u8>> = row.get(10).map_err(get_err)?;
    let created_at: i64 = row.get(14).map_err(get_err)?;
    let deleted_at: Option<i64> = row.get(15).map_err(get_err)?;

    let content_hash = content_hash
        .map(|bytes| ContentHash::from_slice(&bytes))
        .transpose()
        .map_err(|err| MetadataError::Corrupt(format!("document {id}: {err}")))?;

    let key = if is_encrypted {
        Some(map_key(&id, key_protection, encryption_key, encryption_iv)?)
    } else {
        None
    };

    Ok(StoredDocument {
        record: DocumentRecord {
            id,
            storage_key: row.get(2).map_err(get_err)?,
            original_name: row.get(3).map_err(get_err)?,
            mime_type: row.get(4).map_err(get_err)?,
            size_bytes: to_u64(size_bytes, "size_bytes")?,
            content_hash,
            is_encrypted,
            tenant_id: row.get(1).map_err(get_err)?,
            owner_user_id: row.get(11).map_err(get_err)?,
            case_id: row.get(12).map_err(get_err)?,
            client_id: row.get(13).map_err(get_err)?,
            created_at: to_u64(created_at, "created_at")?,
        },
        key,
        deleted_at: deleted_at
            .map(|value| to_u64(value, "deleted_at"))
            .transpose()?,
    })
}

fn map_key(
    id: &DocumentId,
    protection: Option<i64>,
    key: Option<Vec<u8>>,
    iv: Option<Vec<u8>>,
) -> MetadataResult<StoredKey> {
    let (Some(protection), Some(key), Some(iv)) = (protection, key, iv) else {
        return Err(MetadataError::Corrupt(format!(
            "document {id}: encrypted record without key material"
        )));
    };
    let protection = KeyProtection::from_i64(protection).ok_or_else(|| {
        MetadataError::Corrupt(format!("document {id}: unknown key protection {protection}"))
    })?;
    let encryption_iv = DocumentIv::from_slice(&iv)
        .map_err(|err| MetadataError::Corrupt(format!("document {id}: {err}")))?;
    Ok(StoredKey {
        protection,
        encryption_key: Zeroizing::new(key),
        encryption_iv,
    })
}
