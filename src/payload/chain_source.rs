//! `ChainDataSource` (§6): the minimal injected RPC surface the Payload
//! Builder needs. The core never talks to a chain node directly.

use crate::vault::ChainDescriptor;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A confirmed, spendable UTXO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: [u8; 32],
    pub vout: u32,
    pub amount_sats: u64,
    /// The scriptPubKey this output is locked to, needed for the BIP-143
    /// sighash preimage (§4.3).
    pub script_pubkey: Vec<u8>,
}

/// Family-specific fee data, as returned by `get_fees` (§6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeInfo {
    Evm { base_fee_wei: u128, suggested_priority_fee_wei: u128 },
    Utxo { byte_fee_sats: u64 },
    Cosmos { gas_price: String },
    Solana { priority_fee_micro_lamports: u64 },
    Sui { reference_gas_price: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_number: u64,
    pub sequence: u64,
}

/// Injected chain RPC boundary (§6). An implementation typically fans out to
/// per-chain JSON-RPC/REST clients; the core treats it as opaque.
#[async_trait]
pub trait ChainDataSource: Send + Sync {
    async fn get_balance(
        &self,
        chain: &ChainDescriptor,
        address: &str,
        contract_address: Option<&str>,
    ) -> anyhow::Result<u128>;

    /// EVM: the pending nonce.
    async fn get_nonce(&self, chain: &ChainDescriptor, address: &str) -> anyhow::Result<u64>;

    async fn get_fees(&self, chain: &ChainDescriptor) -> anyhow::Result<FeeInfo>;

    async fn get_utxos(&self, chain: &ChainDescriptor, address: &str) -> anyhow::Result<Vec<Utxo>>;

    async fn get_recent_blockhash(&self, chain: &ChainDescriptor) -> anyhow::Result<[u8; 32]>;

    async fn get_account(
        &self,
        chain: &ChainDescriptor,
        address: &str,
    ) -> anyhow::Result<AccountInfo>;

    async fn get_erc20_allowance(
        &self,
        chain: &ChainDescriptor,
        token: &str,
        owner: &str,
        spender: &str,
    ) -> anyhow::Result<u128>;
}
