//! The `KeysignPayload` data model (§3, §4.2): the fully-resolved signing
//! request the Pre-signing Hash Generator consumes. Immutable once built —
//! refinements (fee, amount, UTXO selection) produce a new value.

use crate::payload::chain_source::Utxo;
use crate::vault::{AccountCoin, LibType, PartyId};
use serde::{Deserialize, Serialize};

/// Per-input UTXO reference carried on the payload, distinct from the
/// `ChainDataSource::Utxo` the builder selects from: this one has already
/// been committed to a specific transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoInfo {
    pub hash: [u8; 32],
    pub index: u32,
    pub amount_sats: u64,
    pub script: Vec<u8>,
}

impl From<&Utxo> for UtxoInfo {
    fn from(u: &Utxo) -> Self {
        UtxoInfo {
            hash: u.txid,
            index: u.vout,
            amount_sats: u.amount_sats,
            script: u.script_pubkey.clone(),
        }
    }
}

/// Tagged union over chain families (§3, §9's redesign note replacing the
/// source's dynamic keyed union with an exhaustively-matched sum type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockchainSpecific {
    Evm {
        max_fee_wei: u128,
        priority_fee_wei: u128,
        nonce: u64,
        gas_limit: u64,
        chain_id: u64,
    },
    Utxo {
        byte_fee_sats: u64,
    },
    Cosmos {
        account_number: u64,
        sequence: u64,
        gas: u64,
        chain_id: String,
        denom: String,
    },
    Solana {
        recent_blockhash: [u8; 32],
        priority_fee_micro_lamports: u64,
    },
    Sui {
        reference_gas_price: u64,
        gas_budget: u64,
        /// Gas-paying coin object ids, caller-selected from owned coins.
        gas_coins: Vec<String>,
    },
    Thorchain {
        account_number: u64,
        sequence: u64,
        fee: u64,
    },
    /// Ripple, Ton, Tron, Cardano, Polkadot: each carries just the live
    /// sequence/fee-equivalent field its pre-signing encoder needs; none of
    /// these chains has a richer fee model than a flat network fee (§4.3).
    Simple {
        sequence: u64,
        fee: u64,
    },
}

/// `=:<asset>:<dest>:<min_out>/<streaming>/<interval>:<affiliate>:<fee_bps>`
/// memo-based swap (§4.2 step 5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeSwapPayload {
    pub asset: String,
    pub destination_address: String,
    pub min_out: u128,
    pub streaming_interval: u32,
    pub streaming_quantity: u32,
    pub affiliate: Option<String>,
    pub affiliate_fee_bps: u32,
}

/// A provider-built (1inch-style) swap transaction, embedded verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralSwapPayload {
    pub from_address: String,
    pub to_contract: String,
    pub data: Vec<u8>,
    pub value: u128,
    pub gas_limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapPayload {
    Native(NativeSwapPayload),
    General(GeneralSwapPayload),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Erc20ApprovePayload {
    pub spender: String,
    pub amount: u128,
}

/// The fully-resolved signing request (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysignPayload {
    pub coin: AccountCoin,
    pub to_address: String,
    /// Base-unit integer, string-encoded to avoid precision loss on chains
    /// whose amounts exceed `u64` (e.g. 18-decimal EVM values).
    pub to_amount: String,
    pub memo: Option<String>,
    pub vault_public_key_ecdsa: [u8; 33],
    pub vault_local_party_id: PartyId,
    pub lib_type: LibType,
    pub utxo_info: Option<Vec<UtxoInfo>>,
    pub blockchain_specific: BlockchainSpecific,
    pub swap_payload: Option<SwapPayload>,
    pub erc20_approve_payload: Option<Erc20ApprovePayload>,
}

impl KeysignPayload {
    /// §3 invariant: `utxo_info` populated iff the coin's family is UTXO.
    pub fn is_well_formed(&self) -> bool {
        let is_utxo_family = matches!(self.blockchain_specific, BlockchainSpecific::Utxo { .. });
        self.utxo_info.is_some() == is_utxo_family
    }
}
