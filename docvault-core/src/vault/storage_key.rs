use rand::{rngs::OsRng, RngCore};

use crate::unix_millis;

const RANDOM_SUFFIX_LEN: usize = 8;

/// Builds a fresh `<prefix>/<unix-millis>-<16 hex chars>` storage key.
pub(super) fn generate_storage_key(prefix: &str) -> String {
    let mut suffix = [0u8; RANDOM_SUFFIX_LEN];
    OsRng.fill_bytes(&mut suffix);
    format!("{prefix}/{}-{}", unix_millis(), hex::encode(suffix))
}
