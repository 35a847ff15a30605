//! UTXO address codec: HASH160(pubkey) wrapped in either native-segwit
//! bech32 (BTC, LTC) or base58check P2PKH (BCH, DOGE, DASH, ZEC).
//!
//! Cash addresses for BCH and shielded Zcash addresses are out of scope:
//! this core targets the transparent P2PKH path threshold wallets actually
//! sign against (see DESIGN.md).

use crate::derivation::DerivedKey;
use crate::error::ValidationError;
use crate::vault::UtxoNetwork;
use bech32::{segwit, Hrp};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

pub fn hash160(compressed_pubkey: &[u8; 33]) -> [u8; 20] {
    let sha = Sha256::digest(compressed_pubkey);
    let ripe = Ripemd160::digest(sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripe);
    out
}

fn base58check(version: &[u8], payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(version.len() + payload.len() + 4);
    data.extend_from_slice(version);
    data.extend_from_slice(payload);
    let checksum = Sha256::digest(Sha256::digest(&data));
    data.extend_from_slice(&checksum[..4]);
    bs58::encode(data).into_string()
}

fn bech32_p2wpkh(hrp: &str, program: &[u8; 20]) -> Result<String, ValidationError> {
    let hrp = Hrp::parse(hrp)
        .map_err(|e| ValidationError::InvalidAddress(format!("bad bech32 hrp {hrp}: {e}")))?;
    segwit::encode_v0(hrp, program)
        .map_err(|e| ValidationError::InvalidAddress(format!("bech32 encoding failed: {e}")))
}

pub fn derive_address(
    key: &DerivedKey,
    network: UtxoNetwork,
) -> Result<String, ValidationError> {
    let DerivedKey::Ecdsa(compressed) = key else {
        return Err(ValidationError::InvalidPublicKey(
            "UTXO chains require an ECDSA key".into(),
        ));
    };
    let h160 = hash160(compressed);
    match network {
        UtxoNetwork::Btc => bech32_p2wpkh("bc", &h160),
        UtxoNetwork::Ltc => bech32_p2wpkh("ltc", &h160),
        UtxoNetwork::Bch => Ok(base58check(&[0x00], &h160)),
        UtxoNetwork::Doge => Ok(base58check(&[0x1e], &h160)),
        UtxoNetwork::Dash => Ok(base58check(&[0x4c], &h160)),
        UtxoNetwork::Zec => Ok(base58check(&[0x1c, 0xb8], &h160)),
    }
}

/// §4.2 step 1: reject malformed receiver addresses before any network call.
pub fn validate_address(address: &str, network: UtxoNetwork) -> Result<(), ValidationError> {
    match network {
        UtxoNetwork::Btc | UtxoNetwork::Ltc => {
            let expected_hrp = if network == UtxoNetwork::Btc { "bc" } else { "ltc" };
            let (hrp, _data) = segwit::decode(address)
                .map_err(|_| ValidationError::InvalidAddress(address.to_string()))?;
            if hrp.as_str() != expected_hrp {
                return Err(ValidationError::InvalidAddress(address.to_string()));
            }
            Ok(())
        }
        _ => {
            let decoded = bs58::decode(address)
                .into_vec()
                .map_err(|_| ValidationError::InvalidAddress(address.to_string()))?;
            if decoded.len() < 5 {
                return Err(ValidationError::InvalidAddress(address.to_string()));
            }
            let (payload, checksum) = decoded.split_at(decoded.len() - 4);
            let expected = Sha256::digest(Sha256::digest(payload));
            if &expected[..4] != checksum {
                return Err(ValidationError::InvalidAddress(address.to_string()));
            }
            Ok(())
        }
    }
}
