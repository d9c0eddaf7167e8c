use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{check_deadline, MetadataError, MetadataResult, MetadataStore};
use crate::{Deadline, DocumentId, StoredDocument};

/// In-process metadata store.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    rows: Mutex<HashMap<DocumentId, StoredDocument>>,
}

impl MemoryMetadataStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row, soft-deleted ones included, ordered by creation time.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Db`] if the internal lock is poisoned.
    pub fn rows(&self) -> MetadataResult<Vec<StoredDocument>> {
        let mut rows: Vec<StoredDocument> = self.lock()?.values().cloned().collect();
        rows.sort_by_key(|row| row.record.created_at);
        Ok(rows)
    }

    fn lock(&self) -> MetadataResult<MutexGuard<'_, HashMap<DocumentId, StoredDocument>>> {
        self.rows
            .lock()
            .map_err(|_| MetadataError::Db("mutex poisoned".to_string()))
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn create(&self, document: StoredDocument, deadline: Deadline) -> MetadataResult<StoredDocument> {
        check_deadline(deadline)?;
        if !document.is_complete() {
            return Err(MetadataError::Corrupt(
                "encrypted record without key material".to_string(),
            ));
        }
        let mut guard = self.lock()?;
        let storage_key = &document.record.storage_key;
        if guard
            .values()
            .any(|row| &row.record.storage_key == storage_key)
        {
            return Err(MetadataError::DuplicateStorageKey {
                storage_key: storage_key.clone(),
            });
        }
        if guard.contains_key(&document.record.id) {
            return Err(MetadataError::Db(format!(
                "document id already exists: {}",
                document.record.id
            )));
        }
        guard.insert(document.record.id, document.clone());
        Ok(document)
    }

    fn find_by_id(
        &self,
        id: &DocumentId,
        tenant_id: &str,
        deadline: Deadline,
    ) -> MetadataResult<Option<StoredDocument>> {
        check_deadline(deadline)?;
        Ok(self
            .lock()?
            .get(id)
            .filter(|row| row.record.tenant_id == tenant_id && row.deleted_at.is_none())
            .cloned())
    }

    fn mark_deleted(
        &self,
        id: &DocumentId,
        tenant_id: &str,
        now: u64,
        deadline: Deadline,
    ) -> MetadataResult<bool> {
        check_deadline(deadline)?;
        let mut guard = self.lock()?;
        match guard.get_mut(id) {
            Some(row) if row.record.tenant_id == tenant_id && row.deleted_at.is_none() => {
                row.deleted_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
