//! The document vault service.
//!
//! Orchestrates the upload, download, delete and metadata pipelines over the
//! injected adapters. Every operation is blocking and request-scoped; the
//! vault holds no mutable state apart from its [`VaultStats`] counters.

mod storage_key;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::blob::{BlobBackend, BlobError, WritePolicy};
use crate::crypto::{decrypt, encrypt, generate_iv, generate_key, hash, CryptoError};
use crate::events::{EventSink, VaultAction, VaultEvent};
use crate::keys::{KeyBinding, KeyProtector};
use crate::metadata::{MetadataError, MetadataStore};
use crate::{
    unix_millis, ConfigError, Deadline, DocumentId, DocumentRecord, DownloadedDocument, StoredDocument,
    StoredKey, UploadMeta, VaultConfig, VaultError, VaultResult,
};
use storage_key::generate_storage_key;

/// Counters for best-effort failures that were logged but not returned.
#[derive(Debug, Default)]
pub struct VaultStats {
    orphaned_blobs: AtomicU64,
    event_failures: AtomicU64,
}

impl VaultStats {
    /// Blobs that could not be removed after a failed upload or a delete.
    #[must_use]
    pub fn orphaned_blobs(&self) -> u64 {
        self.orphaned_blobs.load(Ordering::Relaxed)
    }

    /// Audit events the sink rejected.
    #[must_use]
    pub fn event_failures(&self) -> u64 {
        self.event_failures.load(Ordering::Relaxed)
    }
}

/// Encrypted, tenant-scoped document storage.
///
/// `DocumentVault` is `Send + Sync`; share it behind an [`Arc`] and call it
/// from any thread.
pub struct DocumentVault {
    blobs: Arc<dyn BlobBackend>,
    metadata: Arc<dyn MetadataStore>,
    events: Arc<dyn EventSink>,
    keys: Arc<dyn KeyProtector>,
    config: VaultConfig,
    stats: VaultStats,
}

impl std::fmt::Debug for DocumentVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentVault")
            .field("config", &self.config)
            .field("key_protection", &self.keys.protection())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl DocumentVault {
    /// Creates a vault over the given adapters.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Config`] if `config` fails validation or `blobs`
    /// overwrites existing keys ([`WritePolicy::Overwrite`]).
    pub fn new(
        blobs: Arc<dyn BlobBackend>,
        metadata: Arc<dyn MetadataStore>,
        events: Arc<dyn EventSink>,
        keys: Arc<dyn KeyProtector>,
        config: VaultConfig,
    ) -> VaultResult<Self> {
        config.validate()?;
        if blobs.write_policy() != WritePolicy::RejectExisting {
            return Err(ConfigError::Invalid {
                field: "blob_write_policy",
                reason: "the blob backend must reject writes to existing keys".to_string(),
            }
            .into());
        }
        Ok(Self {
            blobs,
            metadata,
            events,
            keys,
            config,
            stats: VaultStats::default(),
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Best-effort failure counters.
    #[must_use]
    pub const fn stats(&self) -> &VaultStats {
        &self.stats
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(self.config.operation_timeout())
    }

    /// Encrypts and stores `plaintext`, returning its record.
    ///
    /// # Errors
    ///
    /// See [`DocumentVault::upload_with_deadline`].
    pub fn upload(&self, plaintext: &[u8], meta: UploadMeta) -> VaultResult<DocumentRecord> {
        self.upload_with_deadline(plaintext, meta, self.deadline())
    }

    /// Encrypts and stores `plaintext` under a caller-supplied deadline.
    ///
    /// Either both the blob and the metadata row exist afterwards, or neither
    /// is resolvable.
    ///
    /// # Errors
    ///
    /// - [`VaultError::EmptyPayload`] / [`VaultError::PayloadTooLarge`] before any I/O
    /// - [`VaultError::StorageKeyExhausted`] when every generated key collided
    /// - [`VaultError::Blob`] / [`VaultError::Metadata`] for adapter failures
    pub fn upload_with_deadline(
        &self,
        plaintext: &[u8],
        meta: UploadMeta,
        deadline: Deadline,
    ) -> VaultResult<DocumentRecord> {
        let size = plaintext.len() as u64;
        if size == 0 {
            return Err(VaultError::EmptyPayload);
        }
        if size > self.config.max_upload_bytes {
            return Err(VaultError::PayloadTooLarge {
                size,
                max: self.config.max_upload_bytes,
            });
        }

        let content_hash = hash(plaintext);
        let key = generate_key();
        let iv = generate_iv();
        let ciphertext = encrypt(plaintext, &key, &iv);
        let id = DocumentId::generate();
        let protected = self
            .keys
            .protect(&key, &KeyBinding::new(&meta.tenant_id, &id))?;
        drop(key);
        debug!(document_id = %id, size, "document encrypted");

        let attempts = self.config.storage_key_attempts;
        for attempt in 1..=attempts {
            let storage_key = generate_storage_key(&self.config.storage_key_prefix);

            match self
                .blobs
                .put(&storage_key, &ciphertext, &meta.mime_type, deadline)
            {
                Ok(location) => debug!(document_id = %id, %location, "blob stored"),
                Err(BlobError::AlreadyExists { .. }) => {
                    debug!(attempt, %storage_key, "storage key taken at blob backend");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }

            let document = StoredDocument {
                record: DocumentRecord {
                    id,
                    storage_key: storage_key.clone(),
                    original_name: meta.original_name.clone(),
                    mime_type: meta.mime_type.clone(),
                    size_bytes: size,
                    content_hash: Some(content_hash),
                    is_encrypted: true,
                    tenant_id: meta.tenant_id.clone(),
                    owner_user_id: meta.owner_user_id.clone(),
                    case_id: meta.case_id.clone(),
                    client_id: meta.client_id.clone(),
                    created_at: unix_millis(),
                },
                key: Some(StoredKey {
                    protection: self.keys.protection(),
                    encryption_key: protected.clone(),
                    encryption_iv: iv,
                }),
                deleted_at: None,
            };

            match self.metadata.create(document, deadline) {
                Ok(stored) => {
                    let record = stored.record;
                    info!(
                        document_id = %record.id,
                        tenant_id = %record.tenant_id,
                        storage_key = %record.storage_key,
                        size_bytes = record.size_bytes,
                        "document uploaded"
                    );
                    self.emit(VaultAction::Upload, &record, &record.owner_user_id);
                    return Ok(record);
                }
                Err(MetadataError::DuplicateStorageKey { .. }) => {
                    // put rejects occupied keys, so the blob under this key is ours
                    warn!(attempt, %storage_key, "storage key already recorded in metadata");
                    self.discard_blob(&storage_key, "storage key already recorded");
                }
                Err(err) => {
                    self.discard_blob(&storage_key, "metadata write failed");
                    return Err(err.into());
                }
            }
        }

        warn!(attempts, "no free storage key found");
        Err(VaultError::StorageKeyExhausted { attempts })
    }

    /// Returns the verified plaintext of a document.
    ///
    /// # Errors
    ///
    /// See [`DocumentVault::download_with_deadline`].
    pub fn download(
        &self,
        id: &DocumentId,
        tenant_id: &str,
        requesting_user_id: &str,
    ) -> VaultResult<DownloadedDocument> {
        self.download_with_deadline(id, tenant_id, requesting_user_id, self.deadline())
    }

    /// Returns the verified plaintext of a document under a caller-supplied
    /// deadline.
    ///
    /// Bytes are only returned when their SHA-256 matches the recorded hash.
    ///
    /// # Errors
    ///
    /// - [`VaultError::DocumentNotFound`] for unknown, foreign or deleted ids
    /// - [`VaultError::UnsupportedLegacyFormat`] for records stored unencrypted
    /// - [`VaultError::KeyUnavailable`] if the configured key protector cannot open the stored key
    /// - [`VaultError::DocumentCorrupted`] if the blob is missing or does not decrypt
    /// - [`VaultError::IntegrityCheckFailed`] on a hash mismatch
    pub fn download_with_deadline(
        &self,
        id: &DocumentId,
        tenant_id: &str,
        requesting_user_id: &str,
        deadline: Deadline,
    ) -> VaultResult<DownloadedDocument> {
        let stored = self.find_active(id, tenant_id, deadline)?;
        let record = &stored.record;
        if !record.is_encrypted {
            return Err(VaultError::UnsupportedLegacyFormat);
        }
        let (Some(material), Some(expected_hash)) = (stored.key.as_ref(), record.content_hash)
        else {
            warn!(document_id = %id, "encrypted record without key material");
            return Err(VaultError::DocumentCorrupted(
                "record is missing key material".to_string(),
            ));
        };

        let ciphertext = match self.blobs.get(&record.storage_key, deadline) {
            Ok(bytes) => bytes,
            Err(BlobError::NotFound { .. }) => {
                warn!(document_id = %id, storage_key = %record.storage_key, "blob missing for active record");
                return Err(VaultError::DocumentCorrupted("blob not found".to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let key = self
            .keys
            .recover(
                material.protection,
                &material.encryption_key,
                &KeyBinding::new(tenant_id, id),
            )
            .map_err(|err| match err {
                CryptoError::KeyUnwrap(reason) => {
                    warn!(
                        document_id = %id,
                        %reason,
                        protection = %material.protection,
                        "document key could not be opened"
                    );
                    VaultError::KeyUnavailable(reason)
                }
                err => {
                    warn!(document_id = %id, %err, "stored key material is malformed");
                    VaultError::DocumentCorrupted(format!("key material unreadable: {err}"))
                }
            })?;
        let plaintext = decrypt(&ciphertext, &key, &material.encryption_iv).map_err(|err| {
            warn!(document_id = %id, %err, "ciphertext did not decrypt");
            VaultError::DocumentCorrupted(err.to_string())
        })?;
        drop(key);

        if !hash(&plaintext).verify(&expected_hash) {
            warn!(document_id = %id, storage_key = %record.storage_key, "content hash mismatch");
            return Err(VaultError::IntegrityCheckFailed);
        }

        debug!(document_id = %id, size = plaintext.len(), "document verified");
        self.emit(VaultAction::Download, record, requesting_user_id);
        Ok(DownloadedDocument {
            bytes: plaintext,
            mime_type: record.mime_type.clone(),
            original_name: record.original_name.clone(),
        })
    }

    /// Soft-deletes a document and removes its blob on a best-effort basis.
    ///
    /// # Errors
    ///
    /// See [`DocumentVault::delete_with_deadline`].
    pub fn delete(
        &self,
        id: &DocumentId,
        tenant_id: &str,
        requesting_user_id: &str,
    ) -> VaultResult<()> {
        self.delete_with_deadline(id, tenant_id, requesting_user_id, self.deadline())
    }

    /// Soft-deletes a document under a caller-supplied deadline.
    ///
    /// The metadata update is authoritative: once it succeeds the document is
    /// gone for every read path, whatever happens to the blob.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::DocumentNotFound`] for unknown, foreign or already
    /// deleted ids, or [`VaultError::Metadata`] if the soft delete fails.
    pub fn delete_with_deadline(
        &self,
        id: &DocumentId,
        tenant_id: &str,
        requesting_user_id: &str,
        deadline: Deadline,
    ) -> VaultResult<()> {
        let stored = self.find_active(id, tenant_id, deadline)?;
        if !self
            .metadata
            .mark_deleted(id, tenant_id, unix_millis(), deadline)?
        {
            return Err(VaultError::DocumentNotFound);
        }
        info!(document_id = %id, tenant_id, "document deleted");

        self.discard_blob(&stored.record.storage_key, "document deleted");
        self.emit(VaultAction::Delete, &stored.record, requesting_user_id);
        Ok(())
    }

    /// Returns a document's record without touching its blob.
    ///
    /// # Errors
    ///
    /// See [`DocumentVault::get_metadata_with_deadline`].
    pub fn get_metadata(&self, id: &DocumentId, tenant_id: &str) -> VaultResult<DocumentRecord> {
        self.get_metadata_with_deadline(id, tenant_id, self.deadline())
    }

    /// Returns a document's record under a caller-supplied deadline.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::DocumentNotFound`] for unknown, foreign or deleted
    /// ids, or [`VaultError::Metadata`] on store failure.
    pub fn get_metadata_with_deadline(
        &self,
        id: &DocumentId,
        tenant_id: &str,
        deadline: Deadline,
    ) -> VaultResult<DocumentRecord> {
        self.find_active(id, tenant_id, deadline)
            .map(|stored| stored.record)
    }

    fn find_active(
        &self,
        id: &DocumentId,
        tenant_id: &str,
        deadline: Deadline,
    ) -> VaultResult<StoredDocument> {
        self.metadata
            .find_by_id(id, tenant_id, deadline)?
            .ok_or(VaultError::DocumentNotFound)
    }

    fn discard_blob(&self, storage_key: &str, reason: &str) {
        // cleanup gets its own deadline, independent of the caller's
        let deadline = self.deadline();
        match self.blobs.delete(storage_key, deadline) {
            Ok(()) => debug!(storage_key, reason, "blob removed"),
            Err(err) => {
                let orphans = self.stats.orphaned_blobs.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(storage_key, reason, %err, orphans, "orphaned blob left at backend");
            }
        }
    }

    fn emit(&self, action: VaultAction, record: &DocumentRecord, user_id: &str) {
        let event = VaultEvent {
            action,
            document_id: record.id,
            user_id: user_id.to_string(),
            tenant_id: record.tenant_id.clone(),
            size_bytes: record.size_bytes,
            occurred_at: unix_millis(),
        };
        if let Err(err) = self.events.emit(&event) {
            self.stats.event_failures.fetch_add(1, Ordering::Relaxed);
            warn!(%action, document_id = %record.id, %err, "audit event not delivered");
        }
    }
}
