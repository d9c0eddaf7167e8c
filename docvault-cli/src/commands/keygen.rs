//! Keygen command: print a fresh master key for `DOCVAULT_MASTER_KEY`.

use docvault_core::keys::MasterKey;

pub fn execute() {
    let encoded = MasterKey::generate().to_hex();
    println!("{}", encoded.as_str());
}
