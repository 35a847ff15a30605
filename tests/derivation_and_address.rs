//! Derivation determinism and address codec round-trips (§4.1, §8
//! properties 1-2), exercised through the public `derivation`/`address`
//! dispatchers rather than any single chain's internals.

use wallet_core::derivation::{self, DerivationCache};
use wallet_core::vault::{
    ChainDescriptor, KeyShare, KeyShares, LibType, PartyId, PublicKeys, UtxoNetwork, Vault,
};
use wallet_core::address;

fn test_vault() -> Vault {
    Vault {
        name: "test".into(),
        public_keys: PublicKeys {
            // secp256k1 generator point G, compressed.
            ecdsa: [
                0x02, 0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc, 0xbb, 0xac, 0x55, 0xa0, 0x62, 0x95,
                0xce, 0x87, 0x0b, 0x07, 0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce, 0x28, 0xd9, 0x59,
                0xf2, 0x81, 0x5b, 0x16, 0xf8, 0x17, 0x98,
            ],
            // Ed25519 basepoint, compressed.
            eddsa: [
                0x58, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66,
                0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66,
                0x66, 0x66, 0x66, 0x66, 0x66, 0x66,
            ],
        },
        hex_chain_code: [0x42; 32],
        signers: vec![PartyId::from("party-1")],
        local_party_id: PartyId::from("party-1"),
        key_shares: KeyShares {
            ecdsa: KeyShare(Vec::new()),
            eddsa: KeyShare(Vec::new()),
        },
        lib_type: LibType::Dkls,
        threshold: 1,
    }
}

/// Property 1: deriving the same (vault, chain, index) twice, with or
/// without a shared cache, always produces the same key.
#[test]
fn derivation_is_deterministic_across_calls_and_caches() {
    let vault = test_vault();
    let chain = ChainDescriptor::Evm { chain_id: 1 };

    let cache_a = DerivationCache::new();
    let key_a = derivation::derive_public_key(&vault, &chain, 3, &cache_a).unwrap();
    let key_b = derivation::derive_public_key(&vault, &chain, 3, &cache_a).unwrap();
    assert_eq!(key_a, key_b, "cached call must match the first derivation");

    let cache_b = DerivationCache::new();
    let key_c = derivation::derive_public_key(&vault, &chain, 3, &cache_b).unwrap();
    assert_eq!(key_a, key_c, "a fresh cache must not change the derived key");
}

/// Different non-hardened indices must not collide onto the same key.
#[test]
fn different_indices_derive_different_keys() {
    let vault = test_vault();
    let chain = ChainDescriptor::Utxo { network: UtxoNetwork::Btc };
    let cache = DerivationCache::new();

    let key_0 = derivation::derive_public_key(&vault, &chain, 0, &cache).unwrap();
    let key_1 = derivation::derive_public_key(&vault, &chain, 1, &cache).unwrap();
    assert_ne!(key_0, key_1);
}

/// Solana uses the root EdDSA key unchanged (`SingleKey` convention):
/// every index must resolve to the same key.
#[test]
fn solana_single_key_convention_ignores_index() {
    let vault = test_vault();
    let cache = DerivationCache::new();

    let key_0 = derivation::derive_public_key(&vault, &ChainDescriptor::Solana, 0, &cache).unwrap();
    let key_7 = derivation::derive_public_key(&vault, &ChainDescriptor::Solana, 7, &cache).unwrap();
    assert_eq!(key_0, key_7);
    assert_eq!(key_0.as_bytes(), &vault.public_keys.eddsa);
}

/// Sui derives per-index, unlike Solana, and so must NOT collapse to the
/// root key (§9 Open Question: EdDSA derivation convention).
#[test]
fn sui_derived_convention_varies_with_index() {
    let vault = test_vault();
    let cache = DerivationCache::new();

    let key_0 = derivation::derive_public_key(&vault, &ChainDescriptor::Sui, 0, &cache).unwrap();
    let key_1 = derivation::derive_public_key(&vault, &ChainDescriptor::Sui, 1, &cache).unwrap();
    assert_ne!(key_0, key_1);
}

/// Property 2: every chain family's `derive_address` output round-trips
/// through that same family's `validate_address`.
#[test]
fn evm_address_round_trips_through_validation() {
    let vault = test_vault();
    let cache = DerivationCache::new();
    let chain = ChainDescriptor::Evm { chain_id: 1 };

    let key = derivation::derive_public_key(&vault, &chain, 0, &cache).unwrap();
    let addr = address::derive_address(&key, &chain).unwrap();
    assert!(addr.starts_with("0x"));
    assert!(address::validate_address(&addr, &chain).is_ok());
}

#[test]
fn btc_segwit_address_round_trips_through_validation() {
    let vault = test_vault();
    let cache = DerivationCache::new();
    let chain = ChainDescriptor::Utxo { network: UtxoNetwork::Btc };

    let key = derivation::derive_public_key(&vault, &chain, 0, &cache).unwrap();
    let addr = address::derive_address(&key, &chain).unwrap();
    assert!(addr.starts_with("bc1"));
    assert!(address::validate_address(&addr, &chain).is_ok());
}

#[test]
fn cosmos_address_round_trips_and_rejects_wrong_hrp() {
    let vault = test_vault();
    let cache = DerivationCache::new();
    let chain = ChainDescriptor::Cosmos {
        chain_id: "osmosis-1".into(),
        denom: "uosmo".into(),
        decimals: 6,
    };

    let key = derivation::derive_public_key(&vault, &chain, 0, &cache).unwrap();
    let addr = address::derive_address(&key, &chain).unwrap();
    assert!(addr.starts_with("osmo1"));
    assert!(address::validate_address(&addr, &chain).is_ok());

    // The same address is not valid as a cosmoshub receiver (different hrp).
    let cosmoshub = ChainDescriptor::Cosmos {
        chain_id: "cosmoshub-4".into(),
        denom: "uatom".into(),
        decimals: 6,
    };
    assert!(address::validate_address(&addr, &cosmoshub).is_err());
}

#[test]
fn thorchain_and_maya_use_distinct_hrps_off_the_same_key() {
    let vault = test_vault();
    let cache = DerivationCache::new();

    let key = derivation::derive_public_key(&vault, &ChainDescriptor::Thorchain, 0, &cache).unwrap();
    let thor_addr = address::derive_address(&key, &ChainDescriptor::Thorchain).unwrap();
    let maya_addr = address::derive_address(&key, &ChainDescriptor::Maya).unwrap();

    assert!(thor_addr.starts_with("thor1"));
    assert!(maya_addr.starts_with("maya1"));
    assert!(address::validate_address(&thor_addr, &ChainDescriptor::Thorchain).is_ok());
    assert!(address::validate_address(&maya_addr, &ChainDescriptor::Maya).is_ok());
    // Cross-validation must fail: a thor address is not a valid maya one.
    assert!(address::validate_address(&thor_addr, &ChainDescriptor::Maya).is_err());
}

#[test]
fn solana_address_round_trips_as_raw_pubkey() {
    let vault = test_vault();
    let cache = DerivationCache::new();

    let key = derivation::derive_public_key(&vault, &ChainDescriptor::Solana, 0, &cache).unwrap();
    let addr = address::derive_address(&key, &ChainDescriptor::Solana).unwrap();
    assert!(address::validate_address(&addr, &ChainDescriptor::Solana).is_ok());
    assert_eq!(bs58::decode(&addr).into_vec().unwrap(), vault.public_keys.eddsa.to_vec());
}
