//! THORChain / MayaChain pre-signing hashes (§4.3): both chains are
//! Cosmos-SDK forks with the same `SignDoc` shape, so this module is a thin
//! re-export of [`crate::presign::cosmos::pre_signing_hash`], which already
//! matches on `BlockchainSpecific::Thorchain`.

pub use crate::presign::cosmos::pre_signing_hash;
