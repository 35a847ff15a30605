//! Cosmos-SDK family address codec: bech32(hrp, ripemd160(sha256(pubkey))).
//!
//! The distilled spec's `ChainDescriptor::Cosmos` carries a `chain_id` but
//! not the bech32 HRP that address encoding actually needs; per the design
//! note about `getKeysignChain`'s silently-falling-through case table, this
//! core centralizes chain_id -> HRP on a strongly-typed lookup and rejects
//! anything it doesn't recognize instead of guessing (§9 Open Question).

use crate::derivation::DerivedKey;
use crate::error::ValidationError;
use bech32::{Bech32, Hrp};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// THORChain and MayaChain are modeled as their own `ChainDescriptor`
/// variants (not `Cosmos`) but use the identical address scheme, so this
/// table and `derive_address` are reused directly by `presign::thorchain`.
pub fn hrp_for_chain_id(chain_id: &str) -> Result<&'static str, ValidationError> {
    let prefix = chain_id.split('-').next().unwrap_or(chain_id);
    match prefix {
        "cosmoshub" => Ok("cosmos"),
        "osmosis" => Ok("osmo"),
        "kaiyo" => Ok("kujira"),
        "phoenix" | "pisco" => Ok("terra"),
        "dydx-mainnet" | "dydx" => Ok("dydx"),
        "noble" => Ok("noble"),
        "akashnet" => Ok("akash"),
        _ => Err(ValidationError::UnsupportedChain(format!(
            "unknown cosmos chain_id: {chain_id}"
        ))),
    }
}

pub fn derive_address_with_hrp(key: &DerivedKey, hrp: &str) -> Result<String, ValidationError> {
    let DerivedKey::Ecdsa(compressed) = key else {
        return Err(ValidationError::InvalidPublicKey(
            "Cosmos family requires an ECDSA key".into(),
        ));
    };
    let sha = Sha256::digest(compressed);
    let ripe = Ripemd160::digest(sha);
    let hrp = Hrp::parse(hrp)
        .map_err(|e| ValidationError::InvalidAddress(format!("bad bech32 hrp {hrp}: {e}")))?;
    bech32::encode::<Bech32>(hrp, &ripe)
        .map_err(|e| ValidationError::InvalidAddress(format!("bech32 encoding failed: {e}")))
}

pub fn derive_address(key: &DerivedKey, chain_id: &str) -> Result<String, ValidationError> {
    let hrp = hrp_for_chain_id(chain_id)?;
    derive_address_with_hrp(key, hrp)
}

/// §4.2 step 1 / S6: validate a receiver's bech32 HRP matches what this
/// chain expects, without any network call.
pub fn validate_address(address: &str, expected_hrp: &str) -> Result<(), ValidationError> {
    let (hrp, _data) = bech32::decode(address)
        .map_err(|_| ValidationError::InvalidAddress(address.to_string()))?;
    if hrp.as_str() != expected_hrp {
        return Err(ValidationError::InvalidAddress(format!(
            "expected hrp {expected_hrp}, got {}",
            hrp.as_str()
        )));
    }
    Ok(())
}
