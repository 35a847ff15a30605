//! Ed25519 child-key derivation.
//!
//! Real BIP32 has no Ed25519 variant; SLIP-0010 defines one but its
//! non-hardened mode is additive over the curve exactly like secp256k1's, so
//! that is what this core implements for the chains whose convention allows
//! derived addresses. Chains that only ever expose a single address per
//! vault skip derivation entirely and use the root key (§4.1).
use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::scalar::Scalar as CurveScalar;
use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::ValidationError;

type HmacSha512 = Hmac<Sha512>;

/// Whether a chain's EdDSA keys are derived per-index or used as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdDsaConvention {
    /// A single address per vault; `derive_public_key` returns the root key.
    SingleKey,
    /// One address per non-hardened index, via an additive tweak.
    Derived,
}

/// `tweak = SHA512(chain_code || "ed25519-tweak" || ser32(index)) mod L`,
/// `child = root_point + tweak * B`.
pub fn derive_child(
    root_pub: &[u8; 32],
    chain_code: &[u8; 32],
    index: u32,
) -> Result<[u8; 32], ValidationError> {
    let root_point = CompressedEdwardsY(*root_pub)
        .decompress()
        .ok_or_else(|| ValidationError::InvalidPublicKey("invalid Ed25519 point".into()))?;

    let mut mac = HmacSha512::new_from_slice(chain_code).expect("HMAC accepts any key length");
    mac.update(root_pub);
    mac.update(b"ed25519-tweak");
    mac.update(&index.to_be_bytes());
    let digest = mac.finalize().into_bytes();
    let mut wide = [0u8; 64];
    wide.copy_from_slice(&digest);
    let tweak = CurveScalar::from_bytes_mod_order_wide(&wide);

    let child_point = root_point + &tweak * ED25519_BASEPOINT_TABLE;
    Ok(child_point.compress().to_bytes())
}
