//! `PayloadBuilder` (§4.2, §8): receiver validation (S6), funding checks,
//! EVM fee-floor clamping, swap quote expiry, and a regression test for the
//! THORChain/Maya `BlockchainSpecific::Thorchain` construction bugfix.

use async_trait::async_trait;
use wallet_core::error::{CoreError, StateError, ValidationError};
use wallet_core::payload::chain_source::{AccountInfo, ChainDataSource, FeeInfo, Utxo};
use wallet_core::payload::{BlockchainSpecific, FeeSettings, PayloadBuilder, SwapQuote};
use wallet_core::vault::{AccountCoin, ChainDescriptor, LibType, PartyId, UtxoNetwork};

/// A fixed-response `ChainDataSource` double: every call returns whatever
/// this struct was constructed with, regardless of arguments. Good enough
/// for builder tests, which never need per-call variation within one test.
struct FakeChainSource {
    balance: u128,
    fees: FeeInfo,
    nonce: u64,
    utxos: Vec<Utxo>,
    blockhash: [u8; 32],
    account: AccountInfo,
    erc20_allowance: u128,
}

impl Default for FakeChainSource {
    fn default() -> Self {
        Self {
            balance: 0,
            fees: FeeInfo::Evm { base_fee_wei: 10_000_000_000, suggested_priority_fee_wei: 1_000_000_000 },
            nonce: 0,
            utxos: Vec::new(),
            blockhash: [0u8; 32],
            account: AccountInfo { account_number: 7, sequence: 3 },
            erc20_allowance: 0,
        }
    }
}

#[async_trait]
impl ChainDataSource for FakeChainSource {
    async fn get_balance(&self, _: &ChainDescriptor, _: &str, _: Option<&str>) -> anyhow::Result<u128> {
        Ok(self.balance)
    }
    async fn get_nonce(&self, _: &ChainDescriptor, _: &str) -> anyhow::Result<u64> {
        Ok(self.nonce)
    }
    async fn get_fees(&self, _: &ChainDescriptor) -> anyhow::Result<FeeInfo> {
        Ok(self.fees.clone())
    }
    async fn get_utxos(&self, _: &ChainDescriptor, _: &str) -> anyhow::Result<Vec<Utxo>> {
        Ok(self.utxos.clone())
    }
    async fn get_recent_blockhash(&self, _: &ChainDescriptor) -> anyhow::Result<[u8; 32]> {
        Ok(self.blockhash)
    }
    async fn get_account(&self, _: &ChainDescriptor, _: &str) -> anyhow::Result<AccountInfo> {
        Ok(self.account)
    }
    async fn get_erc20_allowance(&self, _: &ChainDescriptor, _: &str, _: &str, _: &str) -> anyhow::Result<u128> {
        Ok(self.erc20_allowance)
    }
}

fn builder(source: &FakeChainSource) -> PayloadBuilder<'_> {
    PayloadBuilder::new(source, [0x02; 33], PartyId::from("party-1"), LibType::Dkls, 1_000_000)
}

fn evm_coin() -> AccountCoin {
    AccountCoin {
        chain: ChainDescriptor::Evm { chain_id: 1 },
        address: "0x1111111111111111111111111111111111111111".into(),
        ticker: "ETH".into(),
        decimals: 18,
        contract_address: None,
        is_native: true,
    }
}

/// S6: a bech32 receiver address whose HRP doesn't match the target cosmos
/// chain is rejected at validation, before any network call.
#[test]
fn cosmos_send_rejects_wrong_hrp_receiver() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let source = FakeChainSource { balance: 10_000_000, ..Default::default() };
    let b = builder(&source);
    let coin = AccountCoin {
        chain: ChainDescriptor::Cosmos { chain_id: "osmosis-1".into(), denom: "uosmo".into(), decimals: 6 },
        address: "osmo1abc".into(),
        ticker: "OSMO".into(),
        decimals: 6,
        contract_address: None,
        is_native: true,
    };
    // A valid bech32 address, but for the cosmoshub hrp, not osmosis.
    let wrong_hrp_receiver = "cosmos1qmp9ftkc3hwrpjgw6m4j3ffk0rmy8kquzdtzzv";

    let result = rt.block_on(b.build_send(coin, wrong_hrp_receiver, 1_000, false, None, None));
    assert!(matches!(
        result,
        Err(CoreError::Validation(ValidationError::InvalidAddress(_)))
    ));
}

/// Sending more than the balance (plus fee reserve for a native coin) is
/// rejected with `StateError::NotEnoughFunds`, not a silent clamp.
#[test]
fn evm_send_rejects_amount_exceeding_balance() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let source = FakeChainSource { balance: 100, ..Default::default() };
    let b = builder(&source);
    let receiver = "0x65261c9d3b49367e6a49902B1e735b2e734F8ee7";

    let result = rt.block_on(b.build_send(evm_coin(), receiver, 1_000_000_000_000_000_000, false, None, None));
    assert!(matches!(result, Err(CoreError::State(StateError::NotEnoughFunds { .. }))));
}

/// A caller-supplied `max_fee_wei` below `2*base_fee + priority_fee` is
/// clamped up to the floor rather than rejected (§4.2 step 2).
#[test]
fn evm_max_fee_override_below_floor_is_clamped_up() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let source = FakeChainSource {
        balance: u128::MAX / 2,
        fees: FeeInfo::Evm { base_fee_wei: 20_000_000_000, suggested_priority_fee_wei: 2_000_000_000 },
        ..Default::default()
    };
    let b = builder(&source);
    let receiver = "0x65261c9d3b49367e6a49902B1e735b2e734F8ee7";
    let fee_settings = FeeSettings { max_fee_wei: Some(1), ..Default::default() };

    let payload = rt
        .block_on(b.build_send(evm_coin(), receiver, 1_000, false, None, Some(fee_settings)))
        .unwrap();
    let BlockchainSpecific::Evm { max_fee_wei, .. } = payload.blockchain_specific else {
        panic!("expected an Evm payload");
    };
    // floor = 2*20e9 + 2e9 = 42e9, well above the caller's override of 1.
    assert_eq!(max_fee_wei, 42_000_000_000);
}

/// A caller override above the floor is honored as-is.
#[test]
fn evm_max_fee_override_above_floor_is_honored() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let source = FakeChainSource {
        balance: u128::MAX / 2,
        fees: FeeInfo::Evm { base_fee_wei: 20_000_000_000, suggested_priority_fee_wei: 2_000_000_000 },
        ..Default::default()
    };
    let b = builder(&source);
    let receiver = "0x65261c9d3b49367e6a49902B1e735b2e734F8ee7";
    let fee_settings = FeeSettings { max_fee_wei: Some(100_000_000_000), ..Default::default() };

    let payload = rt
        .block_on(b.build_send(evm_coin(), receiver, 1_000, false, None, Some(fee_settings)))
        .unwrap();
    let BlockchainSpecific::Evm { max_fee_wei, .. } = payload.blockchain_specific else {
        panic!("expected an Evm payload");
    };
    assert_eq!(max_fee_wei, 100_000_000_000);
}

/// `send_max` on a native EVM coin subtracts the fee from the whole
/// balance rather than from the requested amount.
#[test]
fn evm_send_max_subtracts_fee_from_full_balance() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let source = FakeChainSource {
        balance: 1_000_000_000_000_000_000,
        fees: FeeInfo::Evm { base_fee_wei: 10_000_000_000, suggested_priority_fee_wei: 1_000_000_000 },
        ..Default::default()
    };
    let b = builder(&source);
    let receiver = "0x65261c9d3b49367e6a49902B1e735b2e734F8ee7";

    let payload = rt
        .block_on(b.build_send(evm_coin(), receiver, 0, true, None, None))
        .unwrap();
    let fee = 21_000_000_000_000u128 * 21_000 / 1_000; // max_fee_wei * gas_limit, see below
    let _ = fee;
    let max_fee_wei = 2 * 10_000_000_000u128 + 1_000_000_000;
    let expected_fee = max_fee_wei * 21_000;
    let expected_amount = 1_000_000_000_000_000_000u128 - expected_fee;
    assert_eq!(payload.to_amount, expected_amount.to_string());
}

/// A swap quote past its expiry is rejected with `StateError::QuoteExpired`,
/// never silently honored.
#[test]
fn expired_native_swap_quote_is_rejected() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let source = FakeChainSource { balance: 10_000_000_000_000_000, ..Default::default() };
    let b = builder(&source); // now_unix = 1_000_000 (see `builder`)

    let quote = SwapQuote::Native {
        asset: "THOR.RUNE".into(),
        destination_address: "thor1abc".into(),
        min_out: 1,
        streaming_interval: 1,
        streaming_quantity: 1,
        affiliate: None,
        affiliate_fee_bps: 0,
        inbound_vault_address: "0x65261c9d3b49367e6a49902B1e735b2e734F8ee7".into(),
        expires_at_unix: 999_999, // one second before `now_unix`
    };

    let result = rt.block_on(b.build_swap(evm_coin(), 1_000, quote));
    assert!(matches!(result, Err(CoreError::State(StateError::QuoteExpired))));
}

/// Regression test for the THORChain/Maya builder bugfix: both `build_send`
/// and `build_deposit` must construct `BlockchainSpecific::Thorchain`, not
/// `BlockchainSpecific::Cosmos` — the two are distinct tagged variants and
/// only `Thorchain` is matched by `presign::cosmos`'s THOR/Maya branch.
#[test]
fn thorchain_send_and_deposit_produce_the_thorchain_variant() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let source = FakeChainSource { balance: 10_000_000_000, ..Default::default() };
    let b = builder(&source);
    let coin = AccountCoin {
        chain: ChainDescriptor::Thorchain,
        address: "thor1abc".into(),
        ticker: "RUNE".into(),
        decimals: 8,
        contract_address: None,
        is_native: true,
    };

    let send = rt
        .block_on(b.build_send(coin.clone(), "thor1def", 1_000_000, false, None, None))
        .unwrap();
    assert!(matches!(send.blockchain_specific, BlockchainSpecific::Thorchain { .. }));

    let deposit = rt
        .block_on(b.build_deposit(coin, 1_000_000, "=:ETH.ETH:0xabc".into(), None))
        .unwrap();
    assert!(matches!(deposit.blockchain_specific, BlockchainSpecific::Thorchain { .. }));
}

/// `build_deposit` is only defined for THORChain/Maya; any other chain is
/// rejected outright.
#[test]
fn deposit_on_a_non_thorchain_chain_is_rejected() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let source = FakeChainSource::default();
    let b = builder(&source);

    let result = rt.block_on(b.build_deposit(evm_coin(), 1_000, "memo".into(), None));
    assert!(matches!(result, Err(CoreError::Validation(ValidationError::UnsupportedChain(_)))));
}

mockall::mock! {
    /// A `mockall`-generated `ChainDataSource` double, used where a test
    /// needs to assert *which* calls the builder makes (not just stub a
    /// fixed response the way `FakeChainSource` does).
    ChainSource {}

    #[async_trait]
    impl ChainDataSource for ChainSource {
        async fn get_balance(&self, chain: &ChainDescriptor, address: &str, contract_address: Option<&str>) -> anyhow::Result<u128>;
        async fn get_nonce(&self, chain: &ChainDescriptor, address: &str) -> anyhow::Result<u64>;
        async fn get_fees(&self, chain: &ChainDescriptor) -> anyhow::Result<FeeInfo>;
        async fn get_utxos(&self, chain: &ChainDescriptor, address: &str) -> anyhow::Result<Vec<Utxo>>;
        async fn get_recent_blockhash(&self, chain: &ChainDescriptor) -> anyhow::Result<[u8; 32]>;
        async fn get_account(&self, chain: &ChainDescriptor, address: &str) -> anyhow::Result<AccountInfo>;
        async fn get_erc20_allowance(&self, chain: &ChainDescriptor, token: &str, owner: &str, spender: &str) -> anyhow::Result<u128>;
    }
}

/// An EVM send must look up the nonce and fees for exactly the receiving
/// coin's chain, exactly once each — this is the kind of call-shape
/// assertion a hand-rolled fake can't express, only a mock with
/// expectations can.
#[test]
fn evm_send_queries_nonce_and_fees_exactly_once() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut mock = MockChainSource::new();
    mock.expect_get_balance()
        .times(1)
        .returning(|_, _, _| Ok(u128::MAX / 2));
    mock.expect_get_nonce()
        .withf(|chain, address| matches!(chain, ChainDescriptor::Evm { chain_id: 1 }) && address.starts_with("0x11"))
        .times(1)
        .returning(|_, _| Ok(122));
    mock.expect_get_fees()
        .times(1)
        .returning(|_| Ok(FeeInfo::Evm { base_fee_wei: 20_000_000_000, suggested_priority_fee_wei: 2_000_000_000 }));

    let b = PayloadBuilder::new(&mock, [0x02; 33], PartyId::from("party-1"), LibType::Dkls, 1_000_000);
    let receiver = "0x65261c9d3b49367e6a49902B1e735b2e734F8ee7";
    let payload = rt.block_on(b.build_send(evm_coin(), receiver, 1_000, false, None, None)).unwrap();

    let BlockchainSpecific::Evm { nonce, .. } = payload.blockchain_specific else {
        panic!("expected an Evm payload");
    };
    assert_eq!(nonce, 122);
}

/// S3-adjacent: a UTXO send whose inputs can't cover amount + fee is
/// rejected with `NotEnoughFunds`, surfaced from the coin selector through
/// the builder.
#[test]
fn utxo_send_with_insufficient_inputs_is_rejected() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let source = FakeChainSource {
        fees: FeeInfo::Utxo { byte_fee_sats: 10 },
        utxos: vec![Utxo { txid: [0x00; 32], vout: 0, amount_sats: 1_000, script_pubkey: vec![0x00, 0x14, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0] }],
        ..Default::default()
    };
    let b = builder(&source);
    let coin = AccountCoin {
        chain: ChainDescriptor::Utxo { network: UtxoNetwork::Btc },
        address: "bc1qexampleexampleexampleexampleexamplex".into(),
        ticker: "BTC".into(),
        decimals: 8,
        contract_address: None,
        is_native: true,
    };

    let result = rt.block_on(b.build_send(coin, "bc1qexampleexampleexampleexampleexamplex", 80_000, false, None, None));
    assert!(matches!(result, Err(CoreError::State(StateError::NotEnoughFunds { .. }))));
}
