//! Pre-signing Hash Generator (§4.3): lowers a [`KeysignPayload`] into the
//! chain's canonical unsigned-transaction bytes and the digest(s) the MPC
//! Session Engine must sign — one per UTXO input, exactly one otherwise.

pub mod cosmos;
pub mod evm;
pub mod other;
pub mod ripple;
pub mod solana;
pub mod sui;
pub mod thorchain;
pub mod utxo;

use crate::error::ValidationError;
use crate::payload::KeysignPayload;
use crate::vault::ChainDescriptor;

/// `MessagePreImage` (§3): the digests an MPC session signs for one payload,
/// in order. EdDSA digests are full message bytes rather than a 32-byte
/// hash; the engine treats them as opaque (§4.3 Solana row).
pub enum Digests {
    /// ECDSA chains: one or more fixed-size hashes.
    Fixed32(Vec<[u8; 32]>),
    /// EdDSA chains that sign the message directly rather than a pre-hash.
    Opaque(Vec<u8>),
}

/// `pre_signing_hashes(payload) -> (unsigned_tx_bytes, [Digest])` (§4.3).
pub fn pre_signing_hashes(payload: &KeysignPayload) -> Result<(Vec<u8>, Digests), ValidationError> {
    match &payload.coin.chain {
        ChainDescriptor::Evm { .. } => {
            let (tx, digest) = evm::pre_signing_hash(payload)?;
            Ok((tx, Digests::Fixed32(vec![digest])))
        }
        ChainDescriptor::Utxo { .. } => {
            let (tx, digests) = utxo::pre_signing_hashes(payload)?;
            Ok((tx, Digests::Fixed32(digests)))
        }
        ChainDescriptor::Cosmos { .. } => {
            let (tx, digest) = cosmos::pre_signing_hash(payload)?;
            Ok((tx, Digests::Fixed32(vec![digest])))
        }
        ChainDescriptor::Thorchain | ChainDescriptor::Maya => {
            let (tx, digest) = thorchain::pre_signing_hash(payload)?;
            Ok((tx, Digests::Fixed32(vec![digest])))
        }
        ChainDescriptor::Solana => {
            let (tx, message) = solana::pre_signing_hash(payload)?;
            Ok((tx, Digests::Opaque(message)))
        }
        ChainDescriptor::Sui => {
            let (tx, digest) = sui::pre_signing_hash(payload)?;
            Ok((tx, Digests::Fixed32(vec![digest])))
        }
        ChainDescriptor::Ripple => {
            let (tx, digest) = ripple::pre_signing_hash(payload)?;
            Ok((tx, Digests::Fixed32(vec![digest])))
        }
        ChainDescriptor::Tron => {
            let (tx, digest) = other::pre_signing_hash_tron(payload)?;
            Ok((tx, Digests::Fixed32(vec![digest])))
        }
        ChainDescriptor::Ton => {
            let (tx, digest) = other::pre_signing_hash_ton(payload)?;
            Ok((tx, Digests::Fixed32(vec![digest])))
        }
        ChainDescriptor::Cardano => {
            let (tx, digest) = other::pre_signing_hash_cardano(payload)?;
            Ok((tx, Digests::Fixed32(vec![digest])))
        }
        ChainDescriptor::Polkadot => {
            let (tx, digest) = other::pre_signing_hash_polkadot(payload)?;
            Ok((tx, Digests::Fixed32(vec![digest])))
        }
    }
}

/// The separate prior digest set for a pending `erc20_approve_payload`,
/// signed in the same session before the main payload (§4.3 decision table
/// edge, scenario S5).
pub fn approve_pre_signing_hashes(
    payload: &KeysignPayload,
) -> Result<Option<(Vec<u8>, Digests)>, ValidationError> {
    let Some(approve) = &payload.erc20_approve_payload else {
        return Ok(None);
    };
    let (tx, digest) = evm::approve_pre_signing_hash(payload, approve)?;
    Ok(Some((tx, Digests::Fixed32(vec![digest]))))
}
