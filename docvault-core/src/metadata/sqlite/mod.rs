//! `SQLite` metadata store.

mod helpers;
mod schema;
#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::debug;

use super::{check_deadline, MetadataError, MetadataResult, MetadataStore};
use crate::{unix_millis, Deadline, DocumentId, StoredDocument};
use helpers::{map_db_err, map_document, map_insert_err, to_i64, DOCUMENT_COLUMNS};
use schema::{configure_connection, ensure_schema};

/// Longest a statement waits on a locked database when the deadline allows more.
const MAX_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Metadata store backed by a single `SQLite` database.
///
/// The connection is shared behind a mutex; statements run one at a time.
#[derive(Debug)]
pub struct SqliteMetadataStore {
    conn: Mutex<Connection>,
}

impl SqliteMetadataStore {
    /// Opens or creates the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or its schema is
    /// newer than this build understands.
    pub fn open(path: &Path) -> MetadataResult<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|err| map_db_err(&err))?;
        configure_connection(&conn)?;
        ensure_schema(&conn, unix_millis())?;
        debug!(path = %path.display(), "metadata store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> MetadataResult<Self> {
        let conn = Connection::open_in_memory().map_err(|err| map_db_err(&err))?;
        ensure_schema(&conn, unix_millis())?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn connection(&self, deadline: Deadline) -> MetadataResult<MutexGuard<'_, Connection>> {
        check_deadline(deadline)?;
        let conn = self
            .conn
            .lock()
            .map_err(|_| MetadataError::Db("mutex poisoned".to_string()))?;
        check_deadline(deadline)?;
        conn.busy_timeout(deadline.bounded_by(MAX_BUSY_TIMEOUT))
            .map_err(|err| map_db_err(&err))?;
        Ok(conn)
    }
}

impl MetadataStore for SqliteMetadataStore {
    fn create(&self, document: StoredDocument, deadline: Deadline) -> MetadataResult<StoredDocument> {
        if !document.is_complete() {
            return Err(MetadataError::Corrupt(
                "encrypted record without key material".to_string(),
            ));
        }
        let record = &document.record;
        let size_bytes = to_i64(record.size_bytes, "size_bytes")?;
        let created_at = to_i64(record.created_at, "created_at")?;
        let deleted_at = document
            .deleted_at
            .map(|value| to_i64(value, "deleted_at"))
            .transpose()?;
        let key = document.key.as_ref();

        let conn = self.connection(deadline)?;
        conn.execute(
            "INSERT INTO documents (
                id,
                tenant_id,
                storage_key,
                original_name,
                mime_type,
                size_bytes,
                content_hash,
                is_encrypted,
                key_protection,
                encryption_key,
                encryption_iv,
                owner_user_id,
                case_id,
                client_id,
                created_at,
                deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                record.id.to_string(),
                record.tenant_id,
                record.storage_key,
                record.original_name,
                record.mime_type,
                size_bytes,
                record.content_hash.as_ref().map(|hash| hash.as_bytes().as_slice()),
                record.is_encrypted,
                key.map(|key| key.protection.as_i64()),
                key.map(|key| key.encryption_key.as_slice()),
                key.map(|key| key.encryption_iv.as_bytes().as_slice()),
                record.owner_user_id,
                record.case_id,
                record.client_id,
                created_at,
                deleted_at,
            ],
        )
        .map_err(|err| map_insert_err(&err, &record.storage_key))?;
        drop(conn);

        debug!(document_id = %record.id, storage_key = %record.storage_key, "metadata row created");
        Ok(document)
    }

    fn find_by_id(
        &self,
        id: &DocumentId,
        tenant_id: &str,
        deadline: Deadline,
    ) -> MetadataResult<Option<StoredDocument>> {
        let conn = self.connection(deadline)?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {DOCUMENT_COLUMNS} FROM documents
                     WHERE id = ?1 AND tenant_id = ?2 AND deleted_at IS NULL"
                ),
                params![id.to_string(), tenant_id],
                |row| Ok(map_document(row)),
            )
            .optional()
            .map_err(|err| map_db_err(&err))?;
        row.transpose()
    }

    fn mark_deleted(
        &self,
        id: &DocumentId,
        tenant_id: &str,
        now: u64,
        deadline: Deadline,
    ) -> MetadataResult<bool> {
        let now_i64 = to_i64(now, "now")?;
        let conn = self.connection(deadline)?;
        let changed = conn
            .execute(
                "UPDATE documents SET deleted_at = ?1
                 WHERE id = ?2 AND tenant_id = ?3 AND deleted_at IS NULL",
                params![now_i64, id.to_string(), tenant_id],
            )
            .map_err(|err| map_db_err(&err))?;
        Ok(changed > 0)
    }
}
