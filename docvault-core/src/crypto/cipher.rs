use aes::cipher::block_padding::Pkcs7;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{rngs::OsRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{CryptoError, CryptoResult};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Document key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// IV length in bytes (one AES block).
pub const IV_LEN: usize = 16;

/// AES block length in bytes.
pub const BLOCK_LEN: usize = 16;

/// Per-document AES-256 key.
///
/// Generated once per upload and never reused. Zeroized on drop and redacted
/// in `Debug` output.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DocumentKey([u8; KEY_LEN]);

impl DocumentKey {
    /// Wraps raw key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses key bytes read back from storage.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyMaterial`] if `bytes` is not 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let key: [u8; KEY_LEN] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyMaterial {
                    label: "encryption key",
                    expected: KEY_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(key))
    }

    /// Returns the raw key bytes. Treat this as sensitive material.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Per-document CBC initialization vector.
///
/// Not secret: it is stored next to the record and copied freely.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentIv([u8; IV_LEN]);

impl DocumentIv {
    /// Wraps raw IV bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; IV_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses IV bytes read back from storage.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyMaterial`] if `bytes` is not 16 bytes long.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let iv: [u8; IV_LEN] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyMaterial {
                    label: "encryption iv",
                    expected: IV_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(iv))
    }

    /// Returns the raw IV bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; IV_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DocumentIv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentIv({})", hex::encode(self.0))
    }
}

/// Generates a fresh document key from the OS CSPRNG.
#[must_use]
pub fn generate_key() -> DocumentKey {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    DocumentKey(key)
}

/// Generates a fresh IV from the OS CSPRNG.
#[must_use]
pub fn generate_iv() -> DocumentIv {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    DocumentIv(iv)
}

/// Encrypts `plaintext` with AES-256-CBC and PKCS#7 padding.
///
/// The output is always a non-empty multiple of [`BLOCK_LEN`]; an empty
/// plaintext encrypts to one block of padding.
#[must_use]
pub fn encrypt(plaintext: &[u8], key: &DocumentKey, iv: &DocumentIv) -> Vec<u8> {
    Aes256CbcEnc::new(
        GenericArray::from_slice(key.as_bytes()),
        GenericArray::from_slice(iv.as_bytes()),
    )
    .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypts AES-256-CBC ciphertext produced by [`encrypt`].
///
/// # Errors
///
/// Returns [`CryptoError::DecryptionError`] if the ciphertext is empty, not a
/// multiple of the block size, or carries invalid padding. No partial
/// plaintext is ever returned.
pub fn decrypt(ciphertext: &[u8], key: &DocumentKey, iv: &DocumentIv) -> CryptoResult<Vec<u8>> {
    if ciphertext.is_empty() {
        return Err(CryptoError::DecryptionError("ciphertext is empty"));
    }
    if ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CryptoError::DecryptionError(
            "ciphertext length is not a multiple of the block size",
        ));
    }
    Aes256CbcDec::new(
        GenericArray::from_slice(key.as_bytes()),
        GenericArray::from_slice(iv.as_bytes()),
    )
    .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
    .map_err(|_| CryptoError::DecryptionError("invalid padding"))
}
