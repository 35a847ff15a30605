//! EVM address codec: Keccak256(uncompressed_pub[1..])[12..] hex, EIP-55
//! checksummed.

use crate::derivation::{secp256k1, DerivedKey};
use crate::error::ValidationError;
use sha3::{Digest, Keccak256};

pub fn derive_address(key: &DerivedKey) -> Result<String, ValidationError> {
    let DerivedKey::Ecdsa(compressed) = key else {
        return Err(ValidationError::InvalidPublicKey(
            "EVM requires an ECDSA key".into(),
        ));
    };
    let uncompressed = secp256k1::to_uncompressed(compressed)?;
    let hash = Keccak256::digest(&uncompressed[1..]);
    let address_bytes = &hash[12..];
    Ok(to_checksum(address_bytes))
}

/// EIP-55: uppercase a hex nibble of the lowercase address iff the
/// corresponding nibble of `Keccak256(lowercase_hex_ascii)` is >= 8.
pub fn to_checksum(address_bytes: &[u8]) -> String {
    let lower_hex = hex::encode(address_bytes);
    let hash = Keccak256::digest(lower_hex.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower_hex.chars().enumerate() {
        if c.is_ascii_digit() {
            out.push(c);
            continue;
        }
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Validates an EVM address string: `0x` + 40 hex chars, and if mixed-case,
/// the checksum must match (§4.2 step 1).
pub fn validate_address(address: &str) -> Result<(), ValidationError> {
    let stripped = address
        .strip_prefix("0x")
        .ok_or_else(|| ValidationError::InvalidAddress(address.to_string()))?;
    if stripped.len() != 40 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidAddress(address.to_string()));
    }
    let is_all_one_case = stripped.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        || stripped.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if is_all_one_case {
        return Ok(());
    }
    let bytes = hex::decode(stripped).map_err(|_| ValidationError::InvalidAddress(address.to_string()))?;
    let expected = to_checksum(&bytes);
    if expected == address {
        Ok(())
    } else {
        Err(ValidationError::InvalidAddress(format!(
            "bad EIP-55 checksum for {address}"
        )))
    }
}
