//! Address Codec (§4.1): `derive_address(DerivedKey, ChainDescriptor) -> String`
//! and the inverse `validate_address`, dispatched per chain family.

pub mod cosmos;
pub mod evm;
pub mod other;
pub mod ripple;
pub mod solana;
pub mod sui;
pub mod utxo;

use crate::derivation::DerivedKey;
use crate::error::ValidationError;
use crate::vault::ChainDescriptor;

const THORCHAIN_HRP: &str = "thor";
const MAYACHAIN_HRP: &str = "maya";

pub fn derive_address(key: &DerivedKey, chain: &ChainDescriptor) -> Result<String, ValidationError> {
    match chain {
        ChainDescriptor::Evm { .. } => evm::derive_address(key),
        ChainDescriptor::Utxo { network } => utxo::derive_address(key, *network),
        ChainDescriptor::Cosmos { chain_id, .. } => cosmos::derive_address(key, chain_id),
        ChainDescriptor::Solana => solana::derive_address(key),
        ChainDescriptor::Sui => sui::derive_address(key),
        ChainDescriptor::Ripple => ripple::derive_address(key),
        ChainDescriptor::Ton => other::derive_address_ton(key),
        ChainDescriptor::Tron => other::derive_address_tron(key),
        ChainDescriptor::Cardano => other::derive_address_cardano(key),
        ChainDescriptor::Polkadot => other::derive_address_polkadot(key),
        ChainDescriptor::Thorchain => cosmos::derive_address_with_hrp(key, THORCHAIN_HRP),
        ChainDescriptor::Maya => cosmos::derive_address_with_hrp(key, MAYACHAIN_HRP),
    }
}

/// §4.2 step 1: validate a receiver/refund address before building a payload,
/// without any network round-trip.
pub fn validate_address(address: &str, chain: &ChainDescriptor) -> Result<(), ValidationError> {
    match chain {
        ChainDescriptor::Evm { .. } => evm::validate_address(address),
        ChainDescriptor::Utxo { network } => utxo::validate_address(address, *network),
        ChainDescriptor::Cosmos { .. } => {
            let hrp = match chain {
                ChainDescriptor::Cosmos { chain_id, .. } => cosmos::hrp_for_chain_id(chain_id)?,
                _ => unreachable!(),
            };
            cosmos::validate_address(address, hrp)
        }
        ChainDescriptor::Solana => solana::validate_address(address),
        ChainDescriptor::Sui => sui::validate_address(address),
        ChainDescriptor::Ripple => ripple::validate_address(address),
        ChainDescriptor::Thorchain => cosmos::validate_address(address, THORCHAIN_HRP),
        ChainDescriptor::Maya => cosmos::validate_address(address, MAYACHAIN_HRP),
        ChainDescriptor::Ton => other::validate_address_ton(address),
        ChainDescriptor::Tron => other::validate_address_tron(address),
        ChainDescriptor::Cardano => other::validate_address_cardano(address),
        ChainDescriptor::Polkadot => other::validate_address_polkadot(address),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::DerivedKey;

    #[test]
    fn evm_roundtrips_through_dispatcher() {
        // secp256k1 generator point G, compressed — a known-valid curve point.
        let key = DerivedKey::Ecdsa([
            0x02, 0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc, 0xbb, 0xac, 0x55, 0xa0, 0x62, 0x95, 0xce,
            0x87, 0x0b, 0x07, 0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce, 0x28, 0xd9, 0x59, 0xf2, 0x81,
            0x5b, 0x16, 0xf8, 0x17, 0x98,
        ]);
        let chain = ChainDescriptor::Evm { chain_id: 1 };
        let address = derive_address(&key, &chain).unwrap();
        assert!(address.starts_with("0x"));
        assert!(validate_address(&address, &chain).is_ok());
    }

    #[test]
    fn cosmos_unknown_chain_id_is_rejected() {
        let key = DerivedKey::Ecdsa([0x02; 33]);
        let chain = ChainDescriptor::Cosmos {
            chain_id: "not-a-real-chain".into(),
            denom: "utest".into(),
            decimals: 6,
        };
        assert!(derive_address(&key, &chain).is_err());
    }

    #[test]
    fn solana_address_is_raw_pubkey() {
        let key = DerivedKey::EdDsa([0x11; 32]);
        let address = derive_address(&key, &ChainDescriptor::Solana).unwrap();
        assert_eq!(bs58::decode(&address).into_vec().unwrap(), vec![0x11; 32]);
    }
}
