//! Payload Builder (§4.2): `build_send`, `build_swap`, `build_deposit`.

use crate::address;
use crate::error::{CoreError, StateError, ValidationError};
use crate::payload::chain_source::{ChainDataSource, FeeInfo};
use crate::payload::types::{
    BlockchainSpecific, Erc20ApprovePayload, GeneralSwapPayload, KeysignPayload,
    NativeSwapPayload, SwapPayload, UtxoInfo,
};
use crate::payload::utxo_select::select_utxos;
use crate::vault::{AccountCoin, ChainDescriptor, LibType, PartyId, UtxoNetwork};

/// Caller-supplied fee overrides (§4.2 step 2), subject to the chain's lower
/// bound: EVM `max_fee >= 2*base_fee + priority_fee`; UTXO `byte_fee >=
/// mempool-min` (the data source's `FeeInfo` *is* the mempool-min estimate,
/// so an override below it is simply clamped up rather than rejected — the
/// spec does not name a distinct error for this case).
#[derive(Debug, Clone, Default)]
pub struct FeeSettings {
    pub max_fee_wei: Option<u128>,
    pub priority_fee_wei: Option<u128>,
    pub byte_fee_sats: Option<u64>,
    pub gas_limit: Option<u64>,
}

/// An already-resolved swap quote (§1 non-goal: the core never negotiates a
/// quote itself, only lowers one that already arrived).
#[derive(Debug, Clone)]
pub enum SwapQuote {
    Native {
        asset: String,
        destination_address: String,
        min_out: u128,
        streaming_interval: u32,
        streaming_quantity: u32,
        affiliate: Option<String>,
        affiliate_fee_bps: u32,
        inbound_vault_address: String,
        expires_at_unix: i64,
    },
    General {
        to_contract: String,
        data: Vec<u8>,
        value: u128,
        gas_limit: u64,
        spender: Option<String>,
        expires_at_unix: i64,
    },
}

pub struct PayloadBuilder<'a> {
    chain_source: &'a dyn ChainDataSource,
    vault_public_key_ecdsa: [u8; 33],
    vault_local_party_id: PartyId,
    lib_type: LibType,
    /// The wall-clock "now" used to check `SwapQuote` expiry; injected so
    /// tests can pin it rather than the builder calling `SystemTime::now()`.
    now_unix: i64,
}

impl<'a> PayloadBuilder<'a> {
    pub fn new(
        chain_source: &'a dyn ChainDataSource,
        vault_public_key_ecdsa: [u8; 33],
        vault_local_party_id: PartyId,
        lib_type: LibType,
        now_unix: i64,
    ) -> Self {
        Self {
            chain_source,
            vault_public_key_ecdsa,
            vault_local_party_id,
            lib_type,
            now_unix,
        }
    }

    fn validate_receiver(&self, coin: &AccountCoin, receiver: &str) -> Result<(), ValidationError> {
        address::validate_address(receiver, &coin.chain)
    }

    /// §4.2 step 3: convert a human amount to base units and check funding,
    /// honoring the "send max" native-coin fee-subtraction rule.
    fn refine_amount(
        &self,
        coin: &AccountCoin,
        amount_base_units: u128,
        balance_base_units: u128,
        fee_base_units: u128,
        is_send_max: bool,
    ) -> Result<u128, StateError> {
        if is_send_max && coin.is_native {
            return balance_base_units
                .checked_sub(fee_base_units)
                .ok_or_else(|| StateError::NotEnoughFunds {
                    needed: fee_base_units.to_string(),
                    available: balance_base_units.to_string(),
                });
        }
        let fee_reserve = if coin.is_native { fee_base_units } else { 0 };
        if amount_base_units + fee_reserve > balance_base_units {
            return Err(StateError::NotEnoughFunds {
                needed: (amount_base_units + fee_reserve).to_string(),
                available: balance_base_units.to_string(),
            });
        }
        Ok(amount_base_units)
    }

    /// `build_send(coin, receiver, amount, memo?, fee_settings?) -> KeysignPayload`
    pub async fn build_send(
        &self,
        coin: AccountCoin,
        receiver: &str,
        amount_base_units: u128,
        is_send_max: bool,
        memo: Option<String>,
        fee_settings: Option<FeeSettings>,
    ) -> Result<KeysignPayload, CoreError> {
        self.validate_receiver(&coin, receiver)?;
        let fee_settings = fee_settings.unwrap_or_default();

        let balance = self
            .chain_source
            .get_balance(&coin.chain, &coin.address, coin.contract_address.as_deref())
            .await
            .map_err(|e| StateError::MissingChainField(e.to_string()))?;

        match &coin.chain {
            ChainDescriptor::Evm { chain_id } => {
                self.build_evm_send(coin, *chain_id, receiver, amount_base_units, is_send_max, balance, memo, fee_settings)
                    .await
            }
            ChainDescriptor::Utxo { network } => {
                self.build_utxo_send(coin, *network, receiver, amount_base_units, is_send_max, memo, fee_settings)
                    .await
            }
            ChainDescriptor::Cosmos { chain_id, denom, decimals } => {
                let (chain_id, denom, decimals) = (chain_id.clone(), denom.clone(), *decimals);
                self.build_cosmos_like_send(coin, receiver, amount_base_units, is_send_max, balance, memo, chain_id, denom, decimals, 200_000)
                    .await
            }
            ChainDescriptor::Thorchain | ChainDescriptor::Maya => {
                self.build_thorchain_like_send(coin, receiver, amount_base_units, is_send_max, balance, memo)
                    .await
            }
            ChainDescriptor::Solana => {
                self.build_solana_send(coin, receiver, amount_base_units, is_send_max, balance, memo)
                    .await
            }
            ChainDescriptor::Sui => {
                self.build_sui_send(coin, receiver, amount_base_units, is_send_max, balance, memo)
                    .await
            }
            ChainDescriptor::Ripple | ChainDescriptor::Ton | ChainDescriptor::Tron
            | ChainDescriptor::Cardano | ChainDescriptor::Polkadot => {
                self.build_simple_send(coin, receiver, amount_base_units, is_send_max, balance, memo)
                    .await
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn build_evm_send(
        &self,
        coin: AccountCoin,
        chain_id: u64,
        receiver: &str,
        amount_base_units: u128,
        is_send_max: bool,
        balance: u128,
        memo: Option<String>,
        fee_settings: FeeSettings,
    ) -> Result<KeysignPayload, CoreError> {
        let fees = self
            .chain_source
            .get_fees(&coin.chain)
            .await
            .map_err(|e| StateError::MissingChainField(e.to_string()))?;
        let FeeInfo::Evm { base_fee_wei, suggested_priority_fee_wei } = fees else {
            return Err(StateError::MissingChainField("expected EVM fee info".into()).into());
        };
        let nonce = self
            .chain_source
            .get_nonce(&coin.chain, &coin.address)
            .await
            .map_err(|e| StateError::MissingChainField(e.to_string()))?;

        let priority_fee_wei = fee_settings.priority_fee_wei.unwrap_or(suggested_priority_fee_wei);
        let min_max_fee = 2 * base_fee_wei + priority_fee_wei;
        let max_fee_wei = fee_settings.max_fee_wei.map(|f| f.max(min_max_fee)).unwrap_or(min_max_fee);
        let gas_limit = fee_settings.gas_limit.unwrap_or(if coin.is_native { 21_000 } else { 65_000 });

        let fee_base_units = max_fee_wei * gas_limit as u128;
        let amount = self.refine_amount(&coin, amount_base_units, balance, fee_base_units, is_send_max)?;

        let erc20_approve_payload = None;
        Ok(KeysignPayload {
            coin,
            to_address: receiver.to_string(),
            to_amount: amount.to_string(),
            memo,
            vault_public_key_ecdsa: self.vault_public_key_ecdsa,
            vault_local_party_id: self.vault_local_party_id.clone(),
            lib_type: self.lib_type,
            utxo_info: None,
            blockchain_specific: BlockchainSpecific::Evm {
                max_fee_wei,
                priority_fee_wei,
                nonce,
                gas_limit,
                chain_id,
            },
            swap_payload: None,
            erc20_approve_payload,
        })
    }

    async fn build_utxo_send(
        &self,
        coin: AccountCoin,
        network: UtxoNetwork,
        receiver: &str,
        amount_sats: u128,
        is_send_max: bool,
        memo: Option<String>,
        fee_settings: FeeSettings,
    ) -> Result<KeysignPayload, CoreError> {
        let fees = self
            .chain_source
            .get_fees(&coin.chain)
            .await
            .map_err(|e| StateError::MissingChainField(e.to_string()))?;
        let FeeInfo::Utxo { byte_fee_sats: mempool_min } = fees else {
            return Err(StateError::MissingChainField("expected UTXO fee info".into()).into());
        };
        let byte_fee_sats = fee_settings.byte_fee_sats.unwrap_or(mempool_min).max(mempool_min);

        let utxos = self
            .chain_source
            .get_utxos(&coin.chain, &coin.address)
            .await
            .map_err(|e| StateError::MissingChainField(e.to_string()))?;

        let segwit = matches!(network, UtxoNetwork::Btc | UtxoNetwork::Ltc);
        let total_available: u64 = utxos.iter().map(|u| u.amount_sats).sum();
        let amount_sats = if is_send_max {
            // send-max on UTXO chains spends the whole wallet; fee is
            // computed against every input with a single (no-change) output.
            let fee = if segwit {
                crate::payload::utxo_select::estimate_fee_segwit(byte_fee_sats, utxos.len(), 1)
            } else {
                crate::payload::utxo_select::estimate_fee_legacy(byte_fee_sats, utxos.len(), 1)
            };
            (total_available as u128).checked_sub(fee as u128).ok_or_else(|| StateError::NotEnoughFunds {
                needed: fee.to_string(),
                available: total_available.to_string(),
            })?
        } else {
            amount_sats
        };

        let amount_u64: u64 = amount_sats
            .try_into()
            .map_err(|_| ValidationError::MalformedPayload("UTXO amount exceeds u64".into()))?;
        let selection = select_utxos(utxos, amount_u64, byte_fee_sats, segwit)?;

        let utxo_info: Vec<UtxoInfo> = selection.selected.iter().map(UtxoInfo::from).collect();

        Ok(KeysignPayload {
            coin,
            to_address: receiver.to_string(),
            to_amount: amount_sats.to_string(),
            memo,
            vault_public_key_ecdsa: self.vault_public_key_ecdsa,
            vault_local_party_id: self.vault_local_party_id.clone(),
            lib_type: self.lib_type,
            utxo_info: Some(utxo_info),
            blockchain_specific: BlockchainSpecific::Utxo { byte_fee_sats },
            swap_payload: None,
            erc20_approve_payload: None,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn build_cosmos_like_send(
        &self,
        coin: AccountCoin,
        receiver: &str,
        amount_base_units: u128,
        is_send_max: bool,
        balance: u128,
        memo: Option<String>,
        chain_id: String,
        denom: String,
        decimals: u32,
        default_gas: u64,
    ) -> Result<KeysignPayload, CoreError> {
        let account = self
            .chain_source
            .get_account(&coin.chain, &coin.address)
            .await
            .map_err(|e| StateError::MissingChainField(e.to_string()))?;
        let fee_base_units = default_gas as u128;
        let amount = self.refine_amount(&coin, amount_base_units, balance, fee_base_units, is_send_max)?;

        Ok(KeysignPayload {
            coin,
            to_address: receiver.to_string(),
            to_amount: amount.to_string(),
            memo,
            vault_public_key_ecdsa: self.vault_public_key_ecdsa,
            vault_local_party_id: self.vault_local_party_id.clone(),
            lib_type: self.lib_type,
            utxo_info: None,
            blockchain_specific: BlockchainSpecific::Cosmos {
                account_number: account.account_number,
                sequence: account.sequence,
                gas: default_gas,
                chain_id,
                denom: format!("{denom}:{decimals}"),
            },
            swap_payload: None,
            erc20_approve_payload: None,
        })
    }

    /// THORChain/Maya are Cosmos-SDK forks but carry their own
    /// `BlockchainSpecific::Thorchain` variant rather than `::Cosmos`, so a
    /// downstream `match` can tell a genuine Cosmos-Hub-family send from a
    /// THOR/Maya one without inspecting `chain_id` (§9 redesign intent for
    /// the tagged-enum payload).
    async fn build_thorchain_like_send(
        &self,
        coin: AccountCoin,
        receiver: &str,
        amount_base_units: u128,
        is_send_max: bool,
        balance: u128,
        memo: Option<String>,
    ) -> Result<KeysignPayload, CoreError> {
        let account = self
            .chain_source
            .get_account(&coin.chain, &coin.address)
            .await
            .map_err(|e| StateError::MissingChainField(e.to_string()))?;
        let fee = 2_000_000u64;
        let amount = self.refine_amount(&coin, amount_base_units, balance, fee as u128, is_send_max)?;

        Ok(KeysignPayload {
            coin,
            to_address: receiver.to_string(),
            to_amount: amount.to_string(),
            memo,
            vault_public_key_ecdsa: self.vault_public_key_ecdsa,
            vault_local_party_id: self.vault_local_party_id.clone(),
            lib_type: self.lib_type,
            utxo_info: None,
            blockchain_specific: BlockchainSpecific::Thorchain {
                account_number: account.account_number,
                sequence: account.sequence,
                fee,
            },
            swap_payload: None,
            erc20_approve_payload: None,
        })
    }

    async fn build_solana_send(
        &self,
        coin: AccountCoin,
        receiver: &str,
        amount_base_units: u128,
        is_send_max: bool,
        balance: u128,
        memo: Option<String>,
    ) -> Result<KeysignPayload, CoreError> {
        let recent_blockhash = self
            .chain_source
            .get_recent_blockhash(&coin.chain)
            .await
            .map_err(|e| StateError::MissingChainField(e.to_string()))?;
        let FeeInfo::Solana { priority_fee_micro_lamports } = self
            .chain_source
            .get_fees(&coin.chain)
            .await
            .map_err(|e| StateError::MissingChainField(e.to_string()))?
        else {
            return Err(StateError::MissingChainField("expected Solana fee info".into()).into());
        };
        let fee_base_units = 5_000u128;
        let amount = self.refine_amount(&coin, amount_base_units, balance, fee_base_units, is_send_max)?;

        Ok(KeysignPayload {
            coin,
            to_address: receiver.to_string(),
            to_amount: amount.to_string(),
            memo,
            vault_public_key_ecdsa: self.vault_public_key_ecdsa,
            vault_local_party_id: self.vault_local_party_id.clone(),
            lib_type: self.lib_type,
            utxo_info: None,
            blockchain_specific: BlockchainSpecific::Solana {
                recent_blockhash,
                priority_fee_micro_lamports,
            },
            swap_payload: None,
            erc20_approve_payload: None,
        })
    }

    async fn build_sui_send(
        &self,
        coin: AccountCoin,
        receiver: &str,
        amount_base_units: u128,
        is_send_max: bool,
        balance: u128,
        memo: Option<String>,
    ) -> Result<KeysignPayload, CoreError> {
        let FeeInfo::Sui { reference_gas_price } = self
            .chain_source
            .get_fees(&coin.chain)
            .await
            .map_err(|e| StateError::MissingChainField(e.to_string()))?
        else {
            return Err(StateError::MissingChainField("expected Sui fee info".into()).into());
        };
        let gas_budget = reference_gas_price * 1_000;
        let amount = self.refine_amount(&coin, amount_base_units, balance, gas_budget as u128, is_send_max)?;

        Ok(KeysignPayload {
            coin,
            to_address: receiver.to_string(),
            to_amount: amount.to_string(),
            memo,
            vault_public_key_ecdsa: self.vault_public_key_ecdsa,
            vault_local_party_id: self.vault_local_party_id.clone(),
            lib_type: self.lib_type,
            utxo_info: None,
            blockchain_specific: BlockchainSpecific::Sui {
                reference_gas_price,
                gas_budget,
                gas_coins: Vec::new(),
            },
            swap_payload: None,
            erc20_approve_payload: None,
        })
    }

    async fn build_simple_send(
        &self,
        coin: AccountCoin,
        receiver: &str,
        amount_base_units: u128,
        is_send_max: bool,
        balance: u128,
        memo: Option<String>,
    ) -> Result<KeysignPayload, CoreError> {
        let account = self
            .chain_source
            .get_account(&coin.chain, &coin.address)
            .await
            .map_err(|e| StateError::MissingChainField(e.to_string()))?;
        let default_fee = 10u128;
        let amount = self.refine_amount(&coin, amount_base_units, balance, default_fee, is_send_max)?;

        Ok(KeysignPayload {
            coin,
            to_address: receiver.to_string(),
            to_amount: amount.to_string(),
            memo,
            vault_public_key_ecdsa: self.vault_public_key_ecdsa,
            vault_local_party_id: self.vault_local_party_id.clone(),
            lib_type: self.lib_type,
            utxo_info: None,
            blockchain_specific: BlockchainSpecific::Simple {
                sequence: account.sequence,
                fee: default_fee as u64,
            },
            swap_payload: None,
            erc20_approve_payload: None,
        })
    }

    /// `build_swap(from_coin, to_coin, amount, quote) -> KeysignPayload` (§4.2 step 5).
    pub async fn build_swap(
        &self,
        from_coin: AccountCoin,
        amount_base_units: u128,
        quote: SwapQuote,
    ) -> Result<KeysignPayload, CoreError> {
        match quote {
            SwapQuote::Native {
                expires_at_unix,
                asset,
                destination_address,
                min_out,
                streaming_interval,
                streaming_quantity,
                affiliate,
                affiliate_fee_bps,
                inbound_vault_address,
            } => {
                if expires_at_unix < self.now_unix {
                    return Err(StateError::QuoteExpired.into());
                }
                let mut payload = self
                    .build_send(from_coin, &inbound_vault_address, amount_base_units, false, None, None)
                    .await?;
                payload.swap_payload = Some(SwapPayload::Native(NativeSwapPayload {
                    asset,
                    destination_address,
                    min_out,
                    streaming_interval,
                    streaming_quantity,
                    affiliate,
                    affiliate_fee_bps,
                }));
                Ok(payload)
            }
            SwapQuote::General {
                expires_at_unix,
                to_contract,
                data,
                value,
                gas_limit,
                spender,
            } => {
                if expires_at_unix < self.now_unix {
                    return Err(StateError::QuoteExpired.into());
                }
                let ChainDescriptor::Evm { chain_id } = from_coin.chain.clone() else {
                    return Err(
                        ValidationError::UnsupportedChain("general swaps require an EVM source chain".into()).into(),
                    );
                };

                let erc20_approve_payload = if let (Some(spender), Some(token)) =
                    (spender.as_ref(), from_coin.contract_address.as_ref())
                {
                    let allowance = self
                        .chain_source
                        .get_erc20_allowance(&from_coin.chain, token, &from_coin.address, spender)
                        .await
                        .map_err(|e| StateError::MissingChainField(e.to_string()))?;
                    if allowance < amount_base_units {
                        Some(Erc20ApprovePayload { spender: spender.clone(), amount: amount_base_units })
                    } else {
                        None
                    }
                } else {
                    None
                };

                let nonce = self
                    .chain_source
                    .get_nonce(&from_coin.chain, &from_coin.address)
                    .await
                    .map_err(|e| StateError::MissingChainField(e.to_string()))?;
                let FeeInfo::Evm { base_fee_wei, suggested_priority_fee_wei } = self
                    .chain_source
                    .get_fees(&from_coin.chain)
                    .await
                    .map_err(|e| StateError::MissingChainField(e.to_string()))?
                else {
                    return Err(StateError::MissingChainField("expected EVM fee info".into()).into());
                };
                let max_fee_wei = 2 * base_fee_wei + suggested_priority_fee_wei;

                Ok(KeysignPayload {
                    coin: from_coin,
                    to_address: to_contract.clone(),
                    to_amount: value.to_string(),
                    memo: None,
                    vault_public_key_ecdsa: self.vault_public_key_ecdsa,
                    vault_local_party_id: self.vault_local_party_id.clone(),
                    lib_type: self.lib_type,
                    utxo_info: None,
                    blockchain_specific: BlockchainSpecific::Evm {
                        max_fee_wei,
                        priority_fee_wei: suggested_priority_fee_wei,
                        nonce,
                        gas_limit,
                        chain_id,
                    },
                    swap_payload: Some(SwapPayload::General(GeneralSwapPayload {
                        from_address: String::new(),
                        to_contract,
                        data,
                        value,
                        gas_limit,
                    })),
                    erc20_approve_payload,
                })
            }
        }
    }

    /// `build_deposit(coin, amount, memo, fee_settings?) -> KeysignPayload`
    /// (THOR/Maya liquidity ops, §4.2).
    pub async fn build_deposit(
        &self,
        coin: AccountCoin,
        amount_base_units: u128,
        memo: String,
        fee_settings: Option<FeeSettings>,
    ) -> Result<KeysignPayload, CoreError> {
        if !matches!(coin.chain, ChainDescriptor::Thorchain | ChainDescriptor::Maya) {
            return Err(ValidationError::UnsupportedChain(
                "deposit is only defined for THORChain/MayaChain".into(),
            )
            .into());
        }
        let _ = fee_settings;
        let balance = self
            .chain_source
            .get_balance(&coin.chain, &coin.address, None)
            .await
            .map_err(|e| StateError::MissingChainField(e.to_string()))?;
        // Deposits are self-sends to the chain's own module account; the
        // memo alone carries the liquidity instruction (§4.2).
        self.build_thorchain_like_send(coin, "", amount_base_units, false, balance, Some(memo))
            .await
    }
}
