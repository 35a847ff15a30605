//! Key Derivation (spec §4.1): derives per-chain public keys from the
//! vault's root ECDSA/EdDSA public keys and chain code.

pub mod cache;
pub mod ed25519;
pub mod secp256k1;

use crate::error::ValidationError;
use crate::vault::{ChainDescriptor, Scheme, Vault};
pub use cache::DerivationCache;

/// A derived public key, still tagged with its scheme so downstream code
/// (address codec, pre-signing hash generator) never has to guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivedKey {
    /// Compressed secp256k1 point, 33 bytes.
    Ecdsa([u8; 33]),
    /// Ed25519 point, 32 bytes.
    EdDsa([u8; 32]),
}

impl DerivedKey {
    pub fn scheme(&self) -> Scheme {
        match self {
            DerivedKey::Ecdsa(_) => Scheme::Ecdsa,
            DerivedKey::EdDsa(_) => Scheme::EdDsa,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            DerivedKey::Ecdsa(b) => b,
            DerivedKey::EdDsa(b) => b,
        }
    }
}

/// Which EdDSA chains get a derived (not root) key. Decided here rather than
/// per-call since it is a fixed property of the chain, like the derivation
/// path itself (see DESIGN.md "Open Question: EdDSA derivation convention").
fn eddsa_convention(chain: &ChainDescriptor) -> ed25519::EdDsaConvention {
    use ed25519::EdDsaConvention::*;
    match chain {
        ChainDescriptor::Solana => SingleKey,
        ChainDescriptor::Sui => Derived,
        ChainDescriptor::Ton => Derived,
        ChainDescriptor::Cardano => Derived,
        ChainDescriptor::Polkadot => Derived,
        _ => SingleKey,
    }
}

/// Non-hardened suffix of a chain's derivation path that this core actually
/// walks at signing time; the hardened prefix (`purpose'/coin_type'/account'`)
/// is folded into the vault's root key by the keygen ceremony, out of scope
/// here (§4.1, §9).
fn non_hardened_suffix(chain: &ChainDescriptor) -> Vec<u32> {
    chain
        .derivation_path()
        .iter()
        .copied()
        .filter(|idx| idx & secp256k1::HARDENED_BIT == 0)
        .collect()
}

/// `derive_public_key(root_pub, chain_code, path) -> DerivedKey` (§4.1).
///
/// `account_index` replaces the caller-supplied `address_index` leaf of the
/// chain's fixed path; `change` is always 0 (external/receive) for the
/// signing flows this core drives — change addresses are a UTXO-selection
/// concern handled in the payload builder, not a derivation concern.
pub fn derive_public_key(
    vault: &Vault,
    chain: &ChainDescriptor,
    account_index: u32,
    cache: &DerivationCache,
) -> Result<DerivedKey, ValidationError> {
    match chain.scheme() {
        Scheme::Ecdsa => {
            let mut path = non_hardened_suffix(chain);
            if let Some(last) = path.last_mut() {
                *last = account_index;
            } else {
                path.push(account_index);
            }
            let root = vault.public_keys.ecdsa;
            let chain_code = vault.hex_chain_code;
            let key = cache.get_or_derive_secp256k1(&root, &chain_code, &path)?;
            Ok(DerivedKey::Ecdsa(key))
        }
        Scheme::EdDsa => {
            let root = vault.public_keys.eddsa;
            match eddsa_convention(chain) {
                ed25519::EdDsaConvention::SingleKey => Ok(DerivedKey::EdDsa(root)),
                ed25519::EdDsaConvention::Derived => {
                    let chain_code = vault.hex_chain_code;
                    let key = cache.get_or_derive_ed25519(&root, &chain_code, account_index)?;
                    Ok(DerivedKey::EdDsa(key))
                }
            }
        }
    }
}
