//! The persistent identity (§3 `Vault`) and the types every other module
//! builds on: `ChainDescriptor`, `AccountCoin`, party/vault identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A signer's identifier within a vault's party set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartyId(pub String);

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PartyId {
    fn from(s: &str) -> Self {
        PartyId(s.to_string())
    }
}

/// The vault identity is its ECDSA root public key (compressed secp256k1
/// point). Two vaults are the same iff this matches.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VaultId(pub [u8; 33]);

impl fmt::Display for VaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// The MPC signing scheme used for a share / chain family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scheme {
    Ecdsa,
    EdDsa,
}

/// Which threshold-signing library produced this vault's shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LibType {
    Dkls,
    Gg20Legacy,
}

/// Opaque, zero-on-drop key-share material. The core never inspects the
/// bytes; they are handed to an [`crate::mpc::primitive::MpcPrimitive`]
/// implementation as-is.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyShare(pub Vec<u8>);

impl fmt::Debug for KeyShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyShare(<{} bytes redacted>)", self.0.len())
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct KeyShares {
    pub ecdsa: KeyShare,
    pub eddsa: KeyShare,
}

impl fmt::Debug for KeyShares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyShares").finish_non_exhaustive()
    }
}

/// The vault's root public keys, shared by all parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeys {
    /// Compressed secp256k1 point, 33 bytes.
    pub ecdsa: [u8; 33],
    /// Ed25519 point, 32 bytes.
    pub eddsa: [u8; 32],
}

/// The persistent identity holding one party's threshold share(s).
///
/// Invariant: `vault_id == public_keys.ecdsa`. Created by a keygen ceremony
/// (out of this core's scope) and never mutated except by a resharing
/// ceremony (also out of scope; only its output shape is fixed here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vault {
    pub name: String,
    pub public_keys: PublicKeys,
    pub hex_chain_code: [u8; 32],
    pub signers: Vec<PartyId>,
    pub local_party_id: PartyId,
    pub key_shares: KeyShares,
    pub lib_type: LibType,
    pub threshold: u32,
}

impl Vault {
    pub fn vault_id(&self) -> VaultId {
        VaultId(self.public_keys.ecdsa)
    }

    /// `threshold <= |signers|` and the local party must be one of the signers.
    pub fn is_well_formed(&self) -> bool {
        self.threshold as usize <= self.signers.len()
            && self.signers.contains(&self.local_party_id)
    }
}

/// An unlocked vault handle: the [`Vault`] metadata plus whatever in-memory
/// access the caller's unlocker granted to the key-share bytes. The core
/// never stores a password and never re-derives one — `VaultStore::unlock`
/// is entirely the storage layer's concern (§6, §9's "file-backed vault
/// storage" redesign note).
pub struct UnlockedVault {
    pub vault: Vault,
}

/// `VaultStore` (§6): the persistent state layout the core treats as
/// read-only. Vault files themselves (encoding, password-based encryption at
/// rest) are out of this core's scope (§1) — only this contract is fixed.
#[async_trait::async_trait]
pub trait VaultStore: Send + Sync {
    async fn load(&self, vault_id: &VaultId) -> anyhow::Result<Vault>;
    async fn unlock(&self, vault_id: &VaultId, password: &str) -> anyhow::Result<UnlockedVault>;
}

/// The UTXO networks this core addresses. Each has its own address codec and
/// dust/fee conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UtxoNetwork {
    Btc,
    Ltc,
    Bch,
    Doge,
    Dash,
    Zec,
}

/// Tagged variant over the chain families this core supports. Each family
/// carries a fixed BIP44-style derivation path and a signature scheme;
/// neither changes once a chain is added (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainDescriptor {
    Evm { chain_id: u64 },
    Utxo { network: UtxoNetwork },
    Cosmos {
        chain_id: String,
        denom: String,
        decimals: u32,
    },
    Solana,
    Sui,
    Ripple,
    Ton,
    Tron,
    Cardano,
    Polkadot,
    Thorchain,
    Maya,
}

impl ChainDescriptor {
    pub fn scheme(&self) -> Scheme {
        match self {
            ChainDescriptor::Solana
            | ChainDescriptor::Sui
            | ChainDescriptor::Ton
            | ChainDescriptor::Cardano
            | ChainDescriptor::Polkadot => Scheme::EdDsa,
            _ => Scheme::Ecdsa,
        }
    }

    /// Fixed BIP44-style path: `[purpose, coin_type, account, change, index]`.
    /// Hardened levels are folded into the shared root key at keygen time;
    /// the core only ever derives the non-hardened `change/index` tail
    /// (§4.1), so this returns the full conceptual path for documentation
    /// and fixture pinning, while `derive_public_key` consumes only the
    /// trailing non-hardened components.
    pub fn derivation_path(&self) -> &'static [u32] {
        match self {
            ChainDescriptor::Evm { .. } => &[44, 60, 0, 0, 0],
            ChainDescriptor::Utxo {
                network: UtxoNetwork::Btc,
            } => &[44, 0, 0, 0, 0],
            ChainDescriptor::Utxo {
                network: UtxoNetwork::Ltc,
            } => &[44, 2, 0, 0, 0],
            ChainDescriptor::Utxo {
                network: UtxoNetwork::Bch,
            } => &[44, 145, 0, 0, 0],
            ChainDescriptor::Utxo {
                network: UtxoNetwork::Doge,
            } => &[44, 3, 0, 0, 0],
            ChainDescriptor::Utxo {
                network: UtxoNetwork::Dash,
            } => &[44, 5, 0, 0, 0],
            ChainDescriptor::Utxo {
                network: UtxoNetwork::Zec,
            } => &[44, 133, 0, 0, 0],
            ChainDescriptor::Cosmos { .. } => &[44, 118, 0, 0, 0],
            ChainDescriptor::Solana => &[44, 501, 0, 0],
            ChainDescriptor::Sui => &[44, 784, 0, 0, 0],
            ChainDescriptor::Ripple => &[44, 144, 0, 0, 0],
            ChainDescriptor::Ton => &[44, 607, 0, 0, 0],
            ChainDescriptor::Tron => &[44, 195, 0, 0, 0],
            ChainDescriptor::Cardano => &[44, 1815, 0, 0, 0],
            ChainDescriptor::Polkadot => &[44, 354, 0, 0, 0],
            ChainDescriptor::Thorchain => &[44, 931, 0, 0, 0],
            ChainDescriptor::Maya => &[44, 931, 0, 0, 0],
        }
    }

    pub fn family_name(&self) -> &'static str {
        match self {
            ChainDescriptor::Evm { .. } => "evm",
            ChainDescriptor::Utxo { .. } => "utxo",
            ChainDescriptor::Cosmos { .. } => "cosmos",
            ChainDescriptor::Solana => "solana",
            ChainDescriptor::Sui => "sui",
            ChainDescriptor::Ripple => "ripple",
            ChainDescriptor::Ton => "ton",
            ChainDescriptor::Tron => "tron",
            ChainDescriptor::Cardano => "cardano",
            ChainDescriptor::Polkadot => "polkadot",
            ChainDescriptor::Thorchain => "thorchain",
            ChainDescriptor::Maya => "maya",
        }
    }
}

/// A coin held (or spent) at an address on some chain.
///
/// The native fee coin of a chain is `is_native = true` with no
/// `contract_address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCoin {
    pub chain: ChainDescriptor,
    pub address: String,
    pub ticker: String,
    pub decimals: u32,
    pub contract_address: Option<String>,
    pub is_native: bool,
}
