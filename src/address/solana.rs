//! Solana address codec: base58(pub), no hashing — the account address
//! *is* the Ed25519 public key.

use crate::derivation::DerivedKey;
use crate::error::ValidationError;

pub fn derive_address(key: &DerivedKey) -> Result<String, ValidationError> {
    let DerivedKey::EdDsa(pub_bytes) = key else {
        return Err(ValidationError::InvalidPublicKey(
            "Solana requires an EdDSA key".into(),
        ));
    };
    Ok(bs58::encode(pub_bytes).into_string())
}

pub fn validate_address(address: &str) -> Result<(), ValidationError> {
    let decoded = bs58::decode(address)
        .into_vec()
        .map_err(|_| ValidationError::InvalidAddress(address.to_string()))?;
    if decoded.len() != 32 {
        return Err(ValidationError::InvalidAddress(address.to_string()));
    }
    Ok(())
}
