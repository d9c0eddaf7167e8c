use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::{CryptoError, CryptoResult};

/// SHA-256 digest length in bytes.
pub const HASH_LEN: usize = 32;

/// SHA-256 digest of a document's plaintext.
///
/// Serialized and displayed as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; HASH_LEN]);

impl ContentHash {
    /// Wraps raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses digest bytes read back from storage.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyMaterial`] if `bytes` is not 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let digest: [u8; HASH_LEN] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyMaterial {
                    label: "content hash",
                    expected: HASH_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(digest))
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Compares two digests in constant time.
    #[must_use]
    pub fn verify(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

/// Computes the SHA-256 of `plaintext`.
#[must_use]
pub fn hash(plaintext: &[u8]) -> ContentHash {
    let digest = Sha256::digest(plaintext);
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&digest);
    ContentHash(out)
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({self})")
    }
}

impl FromStr for ContentHash {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidKeyMaterial {
            label: "content hash",
            expected: HASH_LEN * 2,
            actual: s.len(),
        })?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            hash(b"").to_string(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            hash(b"abc").to_string(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_verify() {
        let a = hash(b"hello-doc!");
        assert!(a.verify(&hash(b"hello-doc!")));
        assert!(!a.verify(&hash(b"hello-doc?")));
    }

    #[test]
    fn test_hex_parse_and_serde() {
        let digest = hash(b"engagement letter");
        let parsed: ContentHash = digest.to_string().parse().expect("parse");
        assert_eq!(parsed, digest);

        let json = serde_json::to_string(&digest).expect("serialize");
        assert_eq!(json, format!("\"{digest}\""));
        let back: ContentHash = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, digest);

        assert!("zz".parse::<ContentHash>().is_err());
        assert!("abcd".parse::<ContentHash>().is_err());
    }
}
