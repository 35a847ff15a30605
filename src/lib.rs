//! Core of a non-custodial threshold-signature wallet SDK: key derivation,
//! address codecs, the keysign payload builder, the pre-signing hash
//! generator, the MPC session engine, and the signature assembler (§1, §2).
//!
//! Vault file encoding, chain RPC clients, and the DKLS-19/FROST protocol
//! implementations themselves are out of scope — the core consumes them
//! through the injected boundaries in [`mpc::primitive`] and
//! [`payload::chain_source`] (§6).

pub mod address;
pub mod broadcast;
pub mod derivation;
pub mod error;
pub mod mpc;
pub mod payload;
pub mod presign;
pub mod sign;
pub mod vault;

pub use error::{CoreError, Result};
pub use vault::{AccountCoin, ChainDescriptor, Vault, VaultId};
