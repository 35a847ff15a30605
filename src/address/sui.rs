//! Sui address codec: blake2b-256(flag ∥ pubkey)[0..32] hex, where `flag`
//! is the signature-scheme tag (`0x00` for Ed25519).

use crate::derivation::DerivedKey;
use crate::error::ValidationError;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

const ED25519_FLAG: u8 = 0x00;

type Blake2b256 = Blake2b<U32>;

pub fn derive_address(key: &DerivedKey) -> Result<String, ValidationError> {
    let DerivedKey::EdDsa(pub_bytes) = key else {
        return Err(ValidationError::InvalidPublicKey(
            "Sui requires an EdDSA key".into(),
        ));
    };
    let mut hasher = Blake2b256::new();
    hasher.update([ED25519_FLAG]);
    hasher.update(pub_bytes);
    let hash = hasher.finalize();
    Ok(format!("0x{}", hex::encode(hash)))
}

pub fn validate_address(address: &str) -> Result<(), ValidationError> {
    let stripped = address
        .strip_prefix("0x")
        .ok_or_else(|| ValidationError::InvalidAddress(address.to_string()))?;
    if stripped.len() != 64 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidAddress(address.to_string()));
    }
    Ok(())
}
