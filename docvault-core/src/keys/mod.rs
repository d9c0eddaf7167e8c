//! Protection of per-document keys at rest.
//!
//! A [`KeyProtector`] turns a [`DocumentKey`] into the bytes persisted in the
//! metadata row and back. [`PlainKeyProtector`] stores the raw key;
//! [`MasterKeyProtector`] seals it under an application master key so a leak
//! of the metadata store alone does not expose document keys.

mod envelope;
mod master;

pub use master::{MasterKey, MasterKeyProtector, MASTER_KEY_LEN};

use zeroize::Zeroizing;

use crate::crypto::{CryptoError, CryptoResult, DocumentKey};
use crate::{DocumentId, KeyProtection};

/// Identity a protected key is bound to.
///
/// Wrapped keys only open for the same tenant and document they were sealed for.
#[derive(Debug, Clone, Copy)]
pub struct KeyBinding<'a> {
    /// Owning tenant.
    pub tenant_id: &'a str,
    /// Document the key encrypts.
    pub document_id: &'a DocumentId,
}

impl<'a> KeyBinding<'a> {
    /// Binds to `tenant_id` and `document_id`.
    #[must_use]
    pub const fn new(tenant_id: &'a str, document_id: &'a DocumentId) -> Self {
        Self {
            tenant_id,
            document_id,
        }
    }
}

/// Converts document keys to and from their stored form.
pub trait KeyProtector: Send + Sync {
    /// Protection applied to newly stored keys.
    fn protection(&self) -> KeyProtection;

    /// Produces the bytes stored for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyWrap`] if sealing fails.
    fn protect(&self, key: &DocumentKey, binding: &KeyBinding<'_>) -> CryptoResult<Zeroizing<Vec<u8>>>;

    /// Recovers a document key from stored bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are malformed, were sealed for another
    /// binding, or use a protection this protector cannot open.
    fn recover(
        &self,
        protection: KeyProtection,
        stored: &[u8],
        binding: &KeyBinding<'_>,
    ) -> CryptoResult<DocumentKey>;
}

/// Stores document keys as raw bytes next to the metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainKeyProtector;

impl KeyProtector for PlainKeyProtector {
    fn protection(&self) -> KeyProtection {
        KeyProtection::Plain
    }

    fn protect(&self, key: &DocumentKey, _binding: &KeyBinding<'_>) -> CryptoResult<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new(key.as_bytes().to_vec()))
    }

    fn recover(
        &self,
        protection: KeyProtection,
        stored: &[u8],
        _binding: &KeyBinding<'_>,
    ) -> CryptoResult<DocumentKey> {
        match protection {
            KeyProtection::Plain => DocumentKey::from_slice(stored),
            KeyProtection::Wrapped => Err(CryptoError::KeyUnwrap(
                "wrapped key requires a master key".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_key;

    #[test]
    fn test_plain_round_trip() {
        let id = DocumentId::generate();
        let binding = KeyBinding::new("tenant-a", &id);
        let key = generate_key();
        let stored = PlainKeyProtector.protect(&key, &binding).expect("protect");
        assert_eq!(stored.as_slice(), key.as_bytes());
        let recovered = PlainKeyProtector
            .recover(KeyProtection::Plain, &stored, &binding)
            .expect("recover");
        assert_eq!(recovered, key);
    }

    #[test]
    fn test_plain_refuses_wrapped_keys() {
        let id = DocumentId::generate();
        let binding = KeyBinding::new("tenant-a", &id);
        match PlainKeyProtector.recover(KeyProtection::Wrapped, &[0u8; 80], &binding) {
            Err(CryptoError::KeyUnwrap(_)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_plain_rejects_short_keys() {
        let id = DocumentId::generate();
        let binding = KeyBinding::new("tenant-a", &id);
        match PlainKeyProtector.recover(KeyProtection::Plain, &[0u8; 16], &binding) {
            Err(CryptoError::InvalidKeyMaterial { .. }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
