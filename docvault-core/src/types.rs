//! Public types for the document vault.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::crypto::{ContentHash, DocumentIv};

/// Opaque document identifier, assigned at upload and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generates a new random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// How a record's document key is held in the metadata store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum KeyProtection {
    /// Raw key bytes stored next to the metadata.
    Plain = 1,
    /// Key sealed under an application master key.
    Wrapped = 2,
}

impl KeyProtection {
    pub(crate) const fn as_i64(self) -> i64 {
        self as i64
    }

    pub(crate) const fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Plain),
            2 => Some(Self::Wrapped),
            _ => None,
        }
    }
}

/// Caller-declared attributes of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMeta {
    /// File name as supplied by the user.
    pub original_name: String,
    /// Declared MIME type. Stored as-is; validation is the caller's job.
    pub mime_type: String,
    /// Tenant that owns the document.
    pub tenant_id: String,
    /// User performing the upload.
    pub owner_user_id: String,
    /// Optional case association.
    pub case_id: Option<String>,
    /// Optional client association.
    pub client_id: Option<String>,
}

impl UploadMeta {
    /// Builds upload metadata without associations.
    #[must_use]
    pub fn new(
        original_name: impl Into<String>,
        mime_type: impl Into<String>,
        tenant_id: impl Into<String>,
        owner_user_id: impl Into<String>,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            mime_type: mime_type.into(),
            tenant_id: tenant_id.into(),
            owner_user_id: owner_user_id.into(),
            case_id: None,
            client_id: None,
        }
    }

    /// Associates the upload with a case.
    #[must_use]
    pub fn with_case(mut self, case_id: impl Into<String>) -> Self {
        self.case_id = Some(case_id.into());
        self
    }

    /// Associates the upload with a client.
    #[must_use]
    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }
}

/// Caller-facing view of a stored document. Never carries key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Document identifier.
    pub id: DocumentId,
    /// Object name at the blob backend.
    pub storage_key: String,
    /// Declared file name.
    pub original_name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// Plaintext size in bytes.
    pub size_bytes: u64,
    /// SHA-256 of the plaintext. `None` only for legacy unencrypted rows.
    pub content_hash: Option<ContentHash>,
    /// `true` for every record created by the vault.
    pub is_encrypted: bool,
    /// Owning tenant.
    pub tenant_id: String,
    /// Uploading user.
    pub owner_user_id: String,
    /// Optional case association.
    pub case_id: Option<String>,
    /// Optional client association.
    pub client_id: Option<String>,
    /// Creation time, unix milliseconds.
    pub created_at: u64,
}

/// Key material persisted alongside a record.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredKey {
    /// How `encryption_key` is protected.
    pub protection: KeyProtection,
    /// Raw key bytes or a sealed key envelope, depending on `protection`.
    pub encryption_key: Zeroizing<Vec<u8>>,
    /// CBC initialization vector.
    pub encryption_iv: DocumentIv,
}

impl fmt::Debug for StoredKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredKey")
            .field("protection", &self.protection)
            .field("encryption_key", &"[REDACTED]")
            .field("encryption_iv", &self.encryption_iv)
            .finish()
    }
}

/// Full metadata row as held by a [`crate::MetadataStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    /// Caller-visible attributes.
    pub record: DocumentRecord,
    /// Key material. Present whenever `record.is_encrypted` is set.
    pub key: Option<StoredKey>,
    /// Soft-delete marker, unix milliseconds.
    pub deleted_at: Option<u64>,
}

impl StoredDocument {
    /// Returns `true` when an encrypted record carries its key, IV and hash.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        !self.record.is_encrypted
            || (self.key.is_some() && self.record.content_hash.is_some())
    }
}

/// Plaintext returned by a verified download.
#[derive(Clone, PartialEq, Eq)]
pub struct DownloadedDocument {
    /// Decrypted, integrity-checked bytes.
    pub bytes: Vec<u8>,
    /// Declared MIME type.
    pub mime_type: String,
    /// Declared file name.
    pub original_name: String,
}

impl fmt::Debug for DownloadedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadedDocument")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("mime_type", &self.mime_type)
            .field("original_name", &self.original_name)
            .finish()
    }
}
