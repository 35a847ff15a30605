//! Read-through derivation cache, keyed by `(root_key, path)` byte content.
//!
//! The distilled spec describes this as a `memoizeAsync`-style module-level
//! cache; per the redesign note in §9 ("Global-like caches... become
//! concurrent maps guarded by per-key locks... owned resources on a context
//! handle rather than module-level state"), it is an explicit owned value a
//! caller constructs once and threads through, not a `static`.

use super::ed25519;
use super::secp256k1;
use crate::error::ValidationError;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Secp256k1CacheKey {
    root: [u8; 33],
    chain_code: [u8; 32],
    path: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Ed25519CacheKey {
    root: [u8; 32],
    chain_code: [u8; 32],
    index: u32,
}

#[derive(Default)]
pub struct DerivationCache {
    secp256k1: Mutex<HashMap<Secp256k1CacheKey, [u8; 33]>>,
    ed25519: Mutex<HashMap<Ed25519CacheKey, [u8; 32]>>,
}

impl DerivationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_derive_secp256k1(
        &self,
        root: &[u8; 33],
        chain_code: &[u8; 32],
        path: &[u32],
    ) -> Result<[u8; 33], ValidationError> {
        let key = Secp256k1CacheKey {
            root: *root,
            chain_code: *chain_code,
            path: path.to_vec(),
        };
        if let Some(cached) = self.secp256k1.lock().get(&key) {
            return Ok(*cached);
        }
        let derived = secp256k1::derive_path(root, chain_code, path)?.public_key;
        self.secp256k1.lock().insert(key, derived);
        Ok(derived)
    }

    pub fn get_or_derive_ed25519(
        &self,
        root: &[u8; 32],
        chain_code: &[u8; 32],
        index: u32,
    ) -> Result<[u8; 32], ValidationError> {
        let key = Ed25519CacheKey {
            root: *root,
            chain_code: *chain_code,
            index,
        };
        if let Some(cached) = self.ed25519.lock().get(&key) {
            return Ok(*cached);
        }
        let derived = ed25519::derive_child(root, chain_code, index)?;
        self.ed25519.lock().insert(key, derived);
        Ok(derived)
    }
}
