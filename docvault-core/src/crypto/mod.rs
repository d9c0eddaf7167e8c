//! Crypto engine: per-document key material, AES-256-CBC and content hashing.
//!
//! Everything here is a pure function of its inputs apart from key and IV
//! generation, which draw from the OS CSPRNG.

mod cipher;
mod hash;

pub use cipher::{
    decrypt, encrypt, generate_iv, generate_key, DocumentIv, DocumentKey, BLOCK_LEN, IV_LEN,
    KEY_LEN,
};
pub use hash::{hash, ContentHash, HASH_LEN};

use thiserror::Error;

/// Result type for crypto engine operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors raised by the crypto engine and key protectors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Key, IV or hash bytes have the wrong length.
    #[error("invalid {label} length: expected {expected}, got {actual}")]
    InvalidKeyMaterial {
        /// Which piece of material was malformed.
        label: &'static str,
        /// Required length in bytes.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// Ciphertext length or padding is invalid.
    #[error("decryption failed: {0}")]
    DecryptionError(&'static str),

    /// Sealing a document key under the master key failed.
    #[error("key wrap failed: {0}")]
    KeyWrap(String),

    /// A wrapped document key could not be opened.
    #[error("key unwrap failed: {0}")]
    KeyUnwrap(String),

    /// The wrapped key envelope uses a version this build cannot read.
    #[error("unsupported key envelope version: {0}")]
    UnsupportedEnvelopeVersion(u32),
}
