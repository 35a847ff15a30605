//! Signature Assembler (§4.4): normalizes raw MPC signatures to canonical
//! on-chain encodings and stitches them into a signed transaction.

pub mod ecdsa;

use crate::error::CryptoError;
use crate::payload::KeysignPayload;
use crate::presign::Digests;
use crate::vault::ChainDescriptor;
use serde::{Deserialize, Serialize};

/// `RawSignature` (§3): the as-received output of `MpcPrimitive::finalize`.
/// For ECDSA, `recovery_id` is the primitive's own claimed bit, if it
/// supplied one at all — `None` when it didn't (some primitives never do).
/// This assembler never trusts it blindly: it re-derives by candidate
/// search against the expected public key and may flip it during
/// normalization (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawSignature {
    Ecdsa { r: [u8; 32], s: [u8; 32], recovery_id: Option<u8> },
    EdDsa { r: [u8; 32], s: [u8; 32] },
}

/// A signature normalized and bound to the digest/expected pubkey it was
/// checked against, ready for chain-specific encoding.
#[derive(Debug, Clone)]
pub struct AssembledSignature {
    pub chain_encoded: Vec<u8>,
}

/// `assemble(unsigned_tx, digests, signatures, scheme, chain) -> signed_tx_bytes`
/// (§4.4). `expected_pub` is the derived public key (§4.1) this session
/// signed against; ECDSA recovery is matched against it, never assumed.
pub fn assemble(
    payload: &KeysignPayload,
    unsigned_tx: &[u8],
    digests: &Digests,
    signatures: &[RawSignature],
    expected_pub_ecdsa: Option<&[u8; 33]>,
    expected_pub_eddsa: Option<&[u8; 32]>,
) -> Result<Vec<u8>, CryptoError> {
    match &payload.coin.chain {
        ChainDescriptor::Evm { .. } => {
            let Digests::Fixed32(hashes) = digests else {
                return Err(CryptoError::SignatureVerificationFailed);
            };
            assemble_evm(payload, &hashes[0], &signatures[0], expected_pub_ecdsa)
        }
        ChainDescriptor::Utxo { .. } => {
            let Digests::Fixed32(hashes) = digests else {
                return Err(CryptoError::SignatureVerificationFailed);
            };
            assemble_utxo(unsigned_tx, hashes, signatures, expected_pub_ecdsa)
        }
        ChainDescriptor::Cosmos { .. } | ChainDescriptor::Thorchain | ChainDescriptor::Maya => {
            let Digests::Fixed32(hashes) = digests else {
                return Err(CryptoError::SignatureVerificationFailed);
            };
            assemble_raw_rs(unsigned_tx, &hashes[0], &signatures[0], expected_pub_ecdsa)
        }
        ChainDescriptor::Ripple | ChainDescriptor::Tron => {
            let Digests::Fixed32(hashes) = digests else {
                return Err(CryptoError::SignatureVerificationFailed);
            };
            assemble_der(unsigned_tx, &hashes[0], &signatures[0], expected_pub_ecdsa)
        }
        ChainDescriptor::Solana
        | ChainDescriptor::Sui
        | ChainDescriptor::Ton
        | ChainDescriptor::Cardano
        | ChainDescriptor::Polkadot => {
            let RawSignature::EdDsa { r, s } = &signatures[0] else {
                return Err(CryptoError::SignatureVerificationFailed);
            };
            ecdsa::verify_eddsa(digests, r, s, expected_pub_eddsa)?;
            let mut signed = unsigned_tx.to_vec();
            signed.extend_from_slice(r);
            signed.extend_from_slice(s);
            Ok(signed)
        }
    }
}

fn assemble_evm(
    payload: &KeysignPayload,
    digest: &[u8; 32],
    sig: &RawSignature,
    expected_pub: Option<&[u8; 33]>,
) -> Result<Vec<u8>, CryptoError> {
    let RawSignature::Ecdsa { r, s, recovery_id } = sig else {
        return Err(CryptoError::SignatureVerificationFailed);
    };
    let (r, s, y_parity) = ecdsa::normalize_and_verify(digest, r, s, *recovery_id, expected_pub)?;
    let fields = crate::presign::evm::resolve_fields(payload).map_err(|_| CryptoError::SignatureVerificationFailed)?;
    Ok(crate::presign::evm::encode_eip1559_signed(&fields, y_parity, &r, &s))
}

fn assemble_utxo(
    unsigned_tx: &[u8],
    digests: &[[u8; 32]],
    signatures: &[RawSignature],
    expected_pub: Option<&[u8; 33]>,
) -> Result<Vec<u8>, CryptoError> {
    const SIGHASH_ALL: u8 = 0x01;
    let mut witness_stack = Vec::with_capacity(digests.len());
    for (digest, sig) in digests.iter().zip(signatures) {
        let RawSignature::Ecdsa { r, s, recovery_id } = sig else {
            return Err(CryptoError::SignatureVerificationFailed);
        };
        let (r, s, _) = ecdsa::normalize_and_verify(digest, r, s, *recovery_id, expected_pub)?;
        let mut der = der_encode(&r, &s);
        der.push(SIGHASH_ALL);
        witness_stack.push(der);
    }
    let mut signed = unsigned_tx.to_vec();
    for witness in witness_stack {
        signed.extend_from_slice(&(witness.len() as u32).to_le_bytes());
        signed.extend_from_slice(&witness);
    }
    Ok(signed)
}

fn assemble_der(
    unsigned_tx: &[u8],
    digest: &[u8; 32],
    sig: &RawSignature,
    expected_pub: Option<&[u8; 33]>,
) -> Result<Vec<u8>, CryptoError> {
    let RawSignature::Ecdsa { r, s, recovery_id } = sig else {
        return Err(CryptoError::SignatureVerificationFailed);
    };
    let (r, s, _) = ecdsa::normalize_and_verify(digest, r, s, *recovery_id, expected_pub)?;
    let mut signed = unsigned_tx.to_vec();
    signed.extend_from_slice(&der_encode(&r, &s));
    Ok(signed)
}

fn assemble_raw_rs(
    unsigned_tx: &[u8],
    digest: &[u8; 32],
    sig: &RawSignature,
    expected_pub: Option<&[u8; 33]>,
) -> Result<Vec<u8>, CryptoError> {
    let RawSignature::Ecdsa { r, s, recovery_id } = sig else {
        return Err(CryptoError::SignatureVerificationFailed);
    };
    let (r, s, _) = ecdsa::normalize_and_verify(digest, r, s, *recovery_id, expected_pub)?;
    let mut signed = unsigned_tx.to_vec();
    signed.extend_from_slice(&r);
    signed.extend_from_slice(&s);
    Ok(signed)
}

/// Minimal-length DER `SEQUENCE { INTEGER r, INTEGER s }`.
fn der_encode(r: &[u8; 32], s: &[u8; 32]) -> Vec<u8> {
    fn encode_integer(x: &[u8; 32]) -> Vec<u8> {
        let first_nonzero = x.iter().position(|&b| b != 0).unwrap_or(31);
        let mut bytes = x[first_nonzero..].to_vec();
        if bytes.first().copied().unwrap_or(0) & 0x80 != 0 {
            bytes.insert(0, 0x00);
        }
        let mut out = vec![0x02, bytes.len() as u8];
        out.extend_from_slice(&bytes);
        out
    }
    let r_der = encode_integer(r);
    let s_der = encode_integer(s);
    let mut out = vec![0x30, (r_der.len() + s_der.len()) as u8];
    out.extend_from_slice(&r_der);
    out.extend_from_slice(&s_der);
    out
}
