//! XRP Ledger address codec: `ripemd160(sha256(pubkey))` base58check with
//! XRPL's own base58 alphabet (§4.1).

use crate::derivation::DerivedKey;
use crate::error::ValidationError;
use bs58::Alphabet;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

const XRPL_ALPHABET: &Alphabet = &Alphabet::new(
    b"rpshnaf39wBUDNEGHJKLM4PQRST7VWXYZ2bcdeCg65jkm8oFqi1tuvAxyz",
)
.expect("valid 58-symbol alphabet");

pub fn derive_address(key: &DerivedKey) -> Result<String, ValidationError> {
    let DerivedKey::Ecdsa(compressed) = key else {
        return Err(ValidationError::InvalidPublicKey(
            "XRP requires an ECDSA key".into(),
        ));
    };
    let sha = Sha256::digest(compressed);
    let ripe = Ripemd160::digest(sha);

    let mut payload = Vec::with_capacity(1 + 20 + 4);
    payload.push(0x00);
    payload.extend_from_slice(&ripe);
    let checksum = Sha256::digest(Sha256::digest(&payload[..21]));
    payload.extend_from_slice(&checksum[..4]);

    Ok(bs58::encode(payload).with_alphabet(XRPL_ALPHABET).into_string())
}

pub fn validate_address(address: &str) -> Result<(), ValidationError> {
    let decoded = bs58::decode(address)
        .with_alphabet(XRPL_ALPHABET)
        .into_vec()
        .map_err(|_| ValidationError::InvalidAddress(address.to_string()))?;
    if decoded.len() != 25 || decoded[0] != 0x00 {
        return Err(ValidationError::InvalidAddress(address.to_string()));
    }
    let (payload, checksum) = decoded.split_at(21);
    let expected = Sha256::digest(Sha256::digest(payload));
    if &expected[..4] != checksum {
        return Err(ValidationError::InvalidAddress(address.to_string()));
    }
    Ok(())
}
