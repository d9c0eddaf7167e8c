//! Wrapped document key persistence format.

use serde::{Deserialize, Serialize};

use crate::crypto::{CryptoError, CryptoResult};

pub(super) const ENVELOPE_VERSION: u32 = 1;

#[derive(Clone, Serialize, Deserialize)]
pub(super) struct WrappedKeyEnvelope {
    pub(super) version: u32,
    pub(super) nonce: Vec<u8>,
    pub(super) ciphertext: Vec<u8>,
}

impl WrappedKeyEnvelope {
    pub(super) const fn new(nonce: Vec<u8>, ciphertext: Vec<u8>) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            nonce,
            ciphertext,
        }
    }

    pub(super) fn serialize(&self) -> CryptoResult<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes)
            .map_err(|err| CryptoError::KeyWrap(err.to_string()))?;
        Ok(bytes)
    }

    pub(super) fn deserialize(bytes: &[u8]) -> CryptoResult<Self> {
        let envelope: Self = ciborium::de::from_reader(bytes)
            .map_err(|err| CryptoError::KeyUnwrap(err.to_string()))?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(CryptoError::UnsupportedEnvelopeVersion(envelope.version));
        }
        Ok(envelope)
    }
}
