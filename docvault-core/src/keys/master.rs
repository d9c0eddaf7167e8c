use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretBox};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::envelope::WrappedKeyEnvelope;
use super::{KeyBinding, KeyProtector};
use crate::crypto::{CryptoError, CryptoResult, DocumentKey};
use crate::KeyProtection;

/// Master key length in bytes.
pub const MASTER_KEY_LEN: usize = 32;

const NONCE_LEN: usize = 24;
const KEK_SALT: &[u8] = b"docvault:kek:salt";
const KEK_INFO_PREFIX: &[u8] = b"docvault:kek:";
const DOCUMENT_KEY_AD: &[u8] = b"docvault:document-key";

/// Application master key used to seal document keys.
///
/// Held in a [`SecretBox`] and zeroized on drop.
pub struct MasterKey(SecretBox<[u8; MASTER_KEY_LEN]>);

impl MasterKey {
    /// Wraps raw key bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; MASTER_KEY_LEN]) -> Self {
        Self(SecretBox::new(Box::new(bytes)))
    }

    /// Generates a fresh master key from the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; MASTER_KEY_LEN]);
        OsRng.fill_bytes(&mut bytes[..]);
        Self::from_bytes(*bytes)
    }

    /// Encodes the key as 64 lowercase hex characters, the form accepted by
    /// [`MasterKey::from_hex`]. The returned string is wiped on drop.
    #[must_use]
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.0.expose_secret()))
    }

    /// Parses a key from 64 hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyMaterial`] if the input is not valid
    /// hex or does not decode to 32 bytes.
    pub fn from_hex(encoded: &str) -> CryptoResult<Self> {
        let invalid = |actual| CryptoError::InvalidKeyMaterial {
            label: "master key hex",
            expected: MASTER_KEY_LEN * 2,
            actual,
        };
        let encoded = encoded.trim();
        let decoded = Zeroizing::new(hex::decode(encoded).map_err(|_| invalid(encoded.len()))?);
        let bytes: [u8; MASTER_KEY_LEN] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| invalid(encoded.len()))?;
        Ok(Self::from_bytes(bytes))
    }

    fn derive_kek(&self, tenant_id: &str) -> CryptoResult<Zeroizing<[u8; 32]>> {
        let hk = Hkdf::<Sha256>::new(Some(KEK_SALT), self.0.expose_secret());
        let mut info = Vec::with_capacity(KEK_INFO_PREFIX.len() + tenant_id.len());
        info.extend_from_slice(KEK_INFO_PREFIX);
        info.extend_from_slice(tenant_id.as_bytes());
        let mut kek = Zeroizing::new([0u8; 32]);
        hk.expand(&info, &mut kek[..])
            .map_err(|err| CryptoError::KeyWrap(err.to_string()))?;
        Ok(kek)
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

fn associated_data(binding: &KeyBinding<'_>) -> Vec<u8> {
    let document_id = binding.document_id.as_uuid().as_bytes();
    let mut ad = Vec::with_capacity(DOCUMENT_KEY_AD.len() + document_id.len());
    ad.extend_from_slice(DOCUMENT_KEY_AD);
    ad.extend_from_slice(document_id);
    ad
}

/// Seals document keys with XChaCha20-Poly1305 under a per-tenant key derived
/// from a [`MasterKey`].
///
/// Records stored in plain form remain readable, so a store can be switched
/// to wrapping without rewriting existing rows.
#[derive(Debug)]
pub struct MasterKeyProtector {
    master: MasterKey,
}

impl MasterKeyProtector {
    /// Creates a protector over `master`.
    #[must_use]
    pub const fn new(master: MasterKey) -> Self {
        Self { master }
    }
}

impl KeyProtector for MasterKeyProtector {
    fn protection(&self) -> KeyProtection {
        KeyProtection::Wrapped
    }

    fn protect(&self, key: &DocumentKey, binding: &KeyBinding<'_>) -> CryptoResult<Zeroizing<Vec<u8>>> {
        let kek = self.master.derive_kek(binding.tenant_id)?;
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&kek[..]));
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: key.as_bytes(),
                    aad: &associated_data(binding),
                },
            )
            .map_err(|err| CryptoError::KeyWrap(err.to_string()))?;
        WrappedKeyEnvelope::new(nonce.to_vec(), ciphertext)
            .serialize()
            .map(Zeroizing::new)
    }

    fn recover(
        &self,
        protection: KeyProtection,
        stored: &[u8],
        binding: &KeyBinding<'_>,
    ) -> CryptoResult<DocumentKey> {
        if protection == KeyProtection::Plain {
            return DocumentKey::from_slice(stored);
        }
        let envelope = WrappedKeyEnvelope::deserialize(stored)?;
        if envelope.nonce.len() != NONCE_LEN {
            return Err(CryptoError::KeyUnwrap(format!(
                "nonce length mismatch: expected {NONCE_LEN}, got {}",
                envelope.nonce.len()
            )));
        }
        let kek = self.master.derive_kek(binding.tenant_id)?;
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&kek[..]));
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(
                    XNonce::from_slice(&envelope.nonce),
                    Payload {
                        msg: &envelope.ciphertext,
                        aad: &associated_data(binding),
                    },
                )
                .map_err(|err| CryptoError::KeyUnwrap(err.to_string()))?,
        );
        DocumentKey::from_slice(&plaintext)
    }
}
