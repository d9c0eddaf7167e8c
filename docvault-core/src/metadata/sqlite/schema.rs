use rusqlite::{params, Connection, OptionalExtension};

use super::helpers::{map_db_err, to_i64};
use crate::metadata::{MetadataError, MetadataResult};

pub(super) const VAULT_SCHEMA_VERSION: i64 = 1;

pub(super) fn configure_connection(conn: &Connection) -> MetadataResult<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = FULL;",
    )
    .map_err(|err| map_db_err(&err))
}

pub(super) fn ensure_schema(conn: &Connection, now: u64) -> MetadataResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS vault_meta (
            schema_version  INTEGER NOT NULL,
            created_at      INTEGER NOT NULL,
            updated_at      INTEGER NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_vault_meta_schema_version
        ON vault_meta (schema_version);

        CREATE TABLE IF NOT EXISTS documents (
            id              TEXT    NOT NULL PRIMARY KEY,
            tenant_id       TEXT    NOT NULL,
            storage_key     TEXT    NOT NULL UNIQUE,
            original_name   TEXT    NOT NULL,
            mime_type       TEXT    NOT NULL,
            size_bytes      INTEGER NOT NULL,
            content_hash    BLOB,
            is_encrypted    INTEGER NOT NULL,
            key_protection  INTEGER,
            encryption_key  BLOB,
            encryption_iv   BLOB,
            owner_user_id   TEXT    NOT NULL,
            case_id         TEXT,
            client_id       TEXT,
            created_at      INTEGER NOT NULL,
            deleted_at      INTEGER,
            CHECK (
                is_encrypted = 0 OR (
                    content_hash IS NOT NULL
                    AND key_protection IS NOT NULL
                    AND encryption_key IS NOT NULL
                    AND encryption_iv IS NOT NULL
                )
            )
        );

        CREATE INDEX IF NOT EXISTS idx_documents_by_tenant
        ON documents (tenant_id, created_at DESC);",
    )
    .map_err(|err| map_db_err(&err))?;

    let stored = conn
        .query_row(
            "SELECT MAX(schema_version) FROM vault_meta",
            [],
            |row| row.get::<_, Option<i64>>(0),
        )
        .optional()
        .map_err(|err| map_db_err(&err))?
        .flatten();

    match stored {
        None => {
            let now_i64 = to_i64(now, "now")?;
            conn.execute(
                "INSERT INTO vault_meta (schema_version, created_at, updated_at)
                 VALUES (?1, ?2, ?3)",
                params![VAULT_SCHEMA_VERSION, now_i64, now_i64],
            )
            .map_err(|err| map_db_err(&err))?;
        }
        Some(version) if version > VAULT_SCHEMA_VERSION => {
            return Err(MetadataError::Db(format!(
                "schema version {version} is newer than supported version {VAULT_SCHEMA_VERSION}"
            )));
        }
        Some(_) => {}
    }
    Ok(())
}
