//! Normalization and verification helpers shared by every Signature
//! Assembler branch (§4.4): low-s ECDSA normalization plus recovery-id
//! matching against the derived public key, and EdDSA verification against
//! the derived Ed25519 point.

use crate::error::CryptoError;
use crate::presign::Digests;
use ed25519_dalek::{Signature as EdSignature, Verifier, VerifyingKey};
use k256::ecdsa::{RecoveryId, Signature as K256Signature, VerifyingKey as K256VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::Scalar;

/// `n / 2`, the secp256k1 low-s boundary (§4.4): any `s > n/2` is replaced by
/// `n - s` and its recovery id's low bit flipped, matching Bitcoin/Ethereum's
/// canonical-signature convention.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// Normalizes `(r, s)` to low-s form, then derives the correct recovery id
/// by candidate search (§4.4: "derive `recovery_id` by trying both
/// candidates and matching against the expected derived public key") and
/// verifies the result against `expected_pub` when one is supplied.
///
/// `recovery_id` is the primitive's own claimed bit, if it supplied one at
/// all (`PrimitiveSignature.recovery_id` is `Option<u8>` precisely because
/// some primitives don't). It is tried first as an optimization, but it is
/// never trusted blindly: when it's absent, or when it fails to recover
/// `expected_pub`, both `{0, 1}` are tried before giving up. Without an
/// `expected_pub` to check against there is nothing to search for, so the
/// supplied candidate (or `0`) is used as-is.
///
/// Returns `(r, s, y_parity)` where `y_parity` is the single bit EIP-1559
/// encodes (0 or 1), already consistent with the normalized `s`.
pub fn normalize_and_verify(
    digest: &[u8; 32],
    r: &[u8; 32],
    s: &[u8; 32],
    recovery_id: Option<u8>,
    expected_pub: Option<&[u8; 33]>,
) -> Result<([u8; 32], [u8; 32], u8), CryptoError> {
    let (s_norm, flipped) = normalize_low_s(s);
    let claimed_parity = recovery_id.map(|id| if flipped { id ^ 1 } else { id } & 1);

    let Some(expected) = expected_pub else {
        return Ok((*r, s_norm, claimed_parity.unwrap_or(0)));
    };

    let mut candidates = Vec::with_capacity(2);
    if let Some(parity) = claimed_parity {
        candidates.push(parity);
    }
    for fallback in [0u8, 1u8] {
        if !candidates.contains(&fallback) {
            candidates.push(fallback);
        }
    }

    for y_parity in candidates {
        if recovers_to(digest, r, &s_norm, y_parity, expected) {
            return Ok((*r, s_norm, y_parity));
        }
    }
    Err(CryptoError::SignatureVerificationFailed)
}

fn recovers_to(digest: &[u8; 32], r: &[u8; 32], s: &[u8; 32], y_parity: u8, expected: &[u8; 33]) -> bool {
    let Ok(sig) = K256Signature::from_scalars(*r, *s) else {
        return false;
    };
    let Some(recid) = RecoveryId::from_byte(y_parity) else {
        return false;
    };
    let Ok(recovered) = K256VerifyingKey::recover_from_prehash(digest, &sig, recid) else {
        return false;
    };
    let Ok(recovered_bytes) = TryInto::<[u8; 33]>::try_into(recovered.to_encoded_point(true).as_bytes()) else {
        return false;
    };
    &recovered_bytes == expected
}

fn normalize_low_s(s: &[u8; 32]) -> ([u8; 32], bool) {
    if is_high_s(s) {
        (sub_from_order(s), true)
    } else {
        (*s, false)
    }
}

fn is_high_s(s: &[u8; 32]) -> bool {
    s.as_slice() > SECP256K1_HALF_ORDER.as_slice()
}

/// `n - s` via the field arithmetic `k256::Scalar` already provides, rather
/// than hand-rolling 256-bit subtraction.
fn sub_from_order(s: &[u8; 32]) -> [u8; 32] {
    use k256::elliptic_curve::ops::Reduce;
    use k256::U256;
    let s_scalar: Scalar = <Scalar as Reduce<U256>>::reduce_bytes(s.into());
    let negated = -s_scalar;
    negated.to_bytes().into()
}

/// EdDSA chains never re-derive a recovery id; this just checks the
/// signature verifies against the derived point, treating a caller that
/// supplied no `expected_pub` as "verification not requested" (the MPC
/// primitive itself already produced a signature that only validates
/// against one key).
pub fn verify_eddsa(
    digests: &Digests,
    r: &[u8; 32],
    s: &[u8; 32],
    expected_pub: Option<&[u8; 32]>,
) -> Result<(), CryptoError> {
    let Some(expected) = expected_pub else {
        return Ok(());
    };
    let message = match digests {
        Digests::Opaque(bytes) => bytes.as_slice(),
        Digests::Fixed32(hashes) => {
            hashes.first().map(|h| h.as_slice()).unwrap_or(&[])
        }
    };
    let verifying_key =
        VerifyingKey::from_bytes(expected).map_err(|_| CryptoError::SignatureVerificationFailed)?;
    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(r);
    sig_bytes[32..].copy_from_slice(s);
    let signature = EdSignature::from_bytes(&sig_bytes);
    verifying_key
        .verify(message, &signature)
        .map_err(|_| CryptoError::SignatureVerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::signature::SignatureEncoding;

    #[test]
    fn high_s_is_flipped_to_low_s_and_recovery_bit_toggled() {
        let high_s = [0xffu8; 32];
        let (normalized, flipped) = normalize_low_s(&high_s);
        assert!(flipped);
        assert!(!is_high_s(&normalized));
    }

    #[test]
    fn low_s_passes_through_unchanged() {
        let mut low_s = [0u8; 32];
        low_s[31] = 0x01;
        let (normalized, flipped) = normalize_low_s(&low_s);
        assert!(!flipped);
        assert_eq!(normalized, low_s);
    }

    fn keypair(seed: u8) -> (k256::ecdsa::SigningKey, [u8; 33]) {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x01;
        bytes[31] = seed;
        let signing_key = k256::ecdsa::SigningKey::from_bytes((&bytes).into()).unwrap();
        let pub_bytes: [u8; 33] = signing_key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .try_into()
            .unwrap();
        (signing_key, pub_bytes)
    }

    /// §4.4: when no recovery id is supplied at all (the `None` case
    /// `PrimitiveSignature.recovery_id` anticipates), both candidates are
    /// searched and the one that recovers `expected_pub` is found.
    #[test]
    fn missing_recovery_id_is_found_by_candidate_search() {
        let (signing_key, pubkey) = keypair(0x01);
        let digest = [0x42u8; 32];
        let (signature, _recid) = signing_key.sign_prehash_recoverable(&digest).unwrap();
        let bytes = signature.to_bytes();
        let r: [u8; 32] = bytes[..32].try_into().unwrap();
        let s: [u8; 32] = bytes[32..].try_into().unwrap();

        let (_, _, y_parity) = normalize_and_verify(&digest, &r, &s, None, Some(&pubkey)).unwrap();
        assert!(recovers_to(&digest, &r, &s, y_parity, &pubkey));
    }

    /// A wrong claimed recovery bit must not be trusted blindly: the
    /// function falls back to the other candidate and still recovers the
    /// expected public key.
    #[test]
    fn wrong_claimed_recovery_id_falls_back_to_the_other_candidate() {
        let (signing_key, pubkey) = keypair(0x02);
        let digest = [0x99u8; 32];
        let (signature, recid) = signing_key.sign_prehash_recoverable(&digest).unwrap();
        let bytes = signature.to_bytes();
        let r: [u8; 32] = bytes[..32].try_into().unwrap();
        let s: [u8; 32] = bytes[32..].try_into().unwrap();

        let wrong_bit = recid.to_byte() ^ 1;
        let (_, _, y_parity) = normalize_and_verify(&digest, &r, &s, Some(wrong_bit), Some(&pubkey)).unwrap();
        assert!(recovers_to(&digest, &r, &s, y_parity, &pubkey));
    }

    /// A signature that recovers to neither candidate against the claimed
    /// public key is still rejected — the search doesn't paper over a
    /// genuinely wrong key.
    #[test]
    fn neither_candidate_recovering_the_wrong_pubkey_is_rejected() {
        let (signing_key, _pubkey) = keypair(0x03);
        let (_, other_pubkey) = keypair(0x04);
        let digest = [0x55u8; 32];
        let (signature, _recid) = signing_key.sign_prehash_recoverable(&digest).unwrap();
        let bytes = signature.to_bytes();
        let r: [u8; 32] = bytes[..32].try_into().unwrap();
        let s: [u8; 32] = bytes[32..].try_into().unwrap();

        assert!(normalize_and_verify(&digest, &r, &s, None, Some(&other_pubkey)).is_err());
    }
}
