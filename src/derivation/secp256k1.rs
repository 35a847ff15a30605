//! Non-hardened BIP32 child derivation on secp256k1, grounded in the
//! teacher's `crypto::hd` HMAC-SHA512 construction but expressed over
//! `k256` instead of `secp256kfun` (that crate's `EvenY` point type is a
//! Taproot/BIP-340 convention this core has no reason to impose on chains
//! that use plain compressed points).

use crate::error::ValidationError;
use hmac::{Hmac, Mac};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{AffinePoint, EncodedPoint, NonZeroScalar, ProjectivePoint, PublicKey};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// `index >= 2^31` marks a hardened BIP32 index, which this core rejects:
/// threshold signing only ever derives non-hardened children from the
/// shared root key.
pub const HARDENED_BIT: u32 = 0x8000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildKey {
    pub public_key: [u8; 33],
    pub chain_code: [u8; 32],
}

/// One step of BIP32 non-hardened public derivation:
/// `I = HMAC-SHA512(chain_code, compressed(parent_pub) || ser32(index))`,
/// `I_L` is the tweak scalar, `I_R` the child chain code,
/// `child_pub = parent_pub + I_L * G`.
pub fn derive_child(
    parent_pub: &[u8; 33],
    chain_code: &[u8; 32],
    index: u32,
) -> Result<ChildKey, ValidationError> {
    if index & HARDENED_BIT != 0 {
        return Err(ValidationError::UnhardenedPathOnly);
    }

    let parent_point = PublicKey::from_sec1_bytes(parent_pub)
        .map_err(|e| ValidationError::InvalidPublicKey(e.to_string()))?;

    let mut mac = HmacSha512::new_from_slice(chain_code).expect("HMAC accepts any key length");
    mac.update(parent_pub);
    mac.update(&index.to_be_bytes());
    let i = mac.finalize().into_bytes();

    let (il, ir) = i.split_at(32);
    let il_scalar = NonZeroScalar::try_from(il)
        .map_err(|_| ValidationError::InvalidPublicKey("derived tweak is zero".into()))?;

    let child_point =
        ProjectivePoint::from(parent_point.as_affine()) + ProjectivePoint::GENERATOR * *il_scalar;
    if child_point.to_affine() == AffinePoint::IDENTITY {
        return Err(ValidationError::InvalidPublicKey(
            "derived child key is the point at infinity".into(),
        ));
    }

    let encoded: EncodedPoint = child_point.to_affine().to_encoded_point(true);
    let mut public_key = [0u8; 33];
    public_key.copy_from_slice(encoded.as_bytes());

    let mut chain_code_out = [0u8; 32];
    chain_code_out.copy_from_slice(ir);

    Ok(ChildKey {
        public_key,
        chain_code: chain_code_out,
    })
}

/// Apply a full non-hardened path (e.g. `[change, address_index]`) in order.
pub fn derive_path(
    root_pub: &[u8; 33],
    root_chain_code: &[u8; 32],
    path: &[u32],
) -> Result<ChildKey, ValidationError> {
    let mut current = ChildKey {
        public_key: *root_pub,
        chain_code: *root_chain_code,
    };
    for &index in path {
        current = derive_child(&current.public_key, &current.chain_code, index)?;
    }
    Ok(current)
}

/// Decompress a 33-byte compressed point to the 65-byte uncompressed form
/// (`0x04 || x || y`), used by the EVM address codec.
pub fn to_uncompressed(public_key: &[u8; 33]) -> Result<[u8; 65], ValidationError> {
    let point = PublicKey::from_sec1_bytes(public_key)
        .map_err(|e| ValidationError::InvalidPublicKey(e.to_string()))?;
    let encoded = point.as_affine().to_encoded_point(false);
    let mut out = [0u8; 65];
    out.copy_from_slice(encoded.as_bytes());
    Ok(out)
}
