//! EVM pre-signing hash generator (§4.3): EIP-1559 (type `0x02`) and legacy
//! RLP encodings, Keccak-256 digest. Pinned against fixture S1.

use crate::error::ValidationError;
use crate::payload::{BlockchainSpecific, Erc20ApprovePayload, KeysignPayload};
use rlp::RlpStream;
use sha3::{Digest, Keccak256};

const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
const ERC20_APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

fn parse_address(hex_address: &str) -> Result<[u8; 20], ValidationError> {
    let stripped = hex_address.strip_prefix("0x").unwrap_or(hex_address);
    let bytes = hex::decode(stripped)
        .map_err(|_| ValidationError::MalformedPayload(format!("bad address hex: {hex_address}")))?;
    bytes
        .try_into()
        .map_err(|_| ValidationError::MalformedPayload(format!("address not 20 bytes: {hex_address}")))
}

fn pad32(value: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[32 - value.len()..].copy_from_slice(value);
    out
}

/// RLP integers are minimal big-endian byte strings (no leading zero byte,
/// zero itself is the empty string) — `rlp`'s `Encodable` for native
/// integers only covers up to `u64`, so `u128` values go through this.
fn append_uint(stream: &mut RlpStream, value: u128) {
    let bytes = value.to_be_bytes();
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    stream.append(&bytes[first_nonzero..].to_vec());
}

/// Builds the calldata for `data = selector(transfer(address,uint256)) ∥
/// pad32(to) ∥ pad32(amount)` (§4.2 step 6 note, §4.3 ERC-20 row).
pub fn erc20_transfer_calldata(to: &str, amount: u128) -> Result<Vec<u8>, ValidationError> {
    let to = parse_address(to)?;
    let mut data = Vec::with_capacity(4 + 32 + 32);
    data.extend_from_slice(&ERC20_TRANSFER_SELECTOR);
    data.extend_from_slice(&pad32(&to));
    data.extend_from_slice(&pad32(&amount.to_be_bytes()));
    Ok(data)
}

pub fn erc20_approve_calldata(approve: &Erc20ApprovePayload) -> Result<Vec<u8>, ValidationError> {
    let spender = parse_address(&approve.spender)?;
    let mut data = Vec::with_capacity(4 + 32 + 32);
    data.extend_from_slice(&ERC20_APPROVE_SELECTOR);
    data.extend_from_slice(&pad32(&spender));
    data.extend_from_slice(&pad32(&approve.amount.to_be_bytes()));
    Ok(data)
}

fn encode_eip1559(
    chain_id: u64,
    nonce: u64,
    max_priority_fee_wei: u128,
    max_fee_wei: u128,
    gas_limit: u64,
    to: &[u8; 20],
    value: u128,
    data: &[u8],
) -> Vec<u8> {
    let mut stream = RlpStream::new_list(9);
    append_uint(&mut stream, chain_id as u128);
    append_uint(&mut stream, nonce as u128);
    append_uint(&mut stream, max_priority_fee_wei);
    append_uint(&mut stream, max_fee_wei);
    append_uint(&mut stream, gas_limit as u128);
    stream.append(&to.to_vec());
    append_uint(&mut stream, value);
    stream.append(&data.to_vec());
    stream.begin_list(0); // access_list=[]
    let mut out = vec![0x02u8];
    out.extend_from_slice(&stream.out());
    out
}

/// Same nine fields plus the signature triple — what the Signature
/// Assembler emits once a normalized `(r, s, y_parity)` is known (§4.4).
pub fn encode_eip1559_signed(fields: &ResolvedEvmFields, y_parity: u8, r: &[u8; 32], s: &[u8; 32]) -> Vec<u8> {
    let mut stream = RlpStream::new_list(12);
    append_uint(&mut stream, fields.chain_id as u128);
    append_uint(&mut stream, fields.nonce as u128);
    append_uint(&mut stream, fields.priority_fee_wei);
    append_uint(&mut stream, fields.max_fee_wei);
    append_uint(&mut stream, fields.gas_limit as u128);
    stream.append(&fields.to.to_vec());
    append_uint(&mut stream, fields.value);
    stream.append(&fields.data.to_vec());
    stream.begin_list(0);
    append_uint(&mut stream, y_parity as u128);
    stream.append(&r.to_vec());
    stream.append(&s.to_vec());
    let mut out = vec![0x02u8];
    out.extend_from_slice(&stream.out());
    out
}

/// The nine EIP-1559 fields this payload resolves to, shared by the digest
/// generator and the Signature Assembler so the latter never has to
/// re-parse RLP to append a signature (§4.4 EVM row).
pub struct ResolvedEvmFields {
    pub chain_id: u64,
    pub nonce: u64,
    pub priority_fee_wei: u128,
    pub max_fee_wei: u128,
    pub gas_limit: u64,
    pub to: [u8; 20],
    pub value: u128,
    pub data: Vec<u8>,
}

pub fn resolve_fields(payload: &KeysignPayload) -> Result<ResolvedEvmFields, ValidationError> {
    let BlockchainSpecific::Evm { max_fee_wei, priority_fee_wei, nonce, gas_limit, chain_id } =
        &payload.blockchain_specific
    else {
        return Err(ValidationError::MalformedPayload(
            "EVM pre-signing requires BlockchainSpecific::Evm".into(),
        ));
    };

    let amount: u128 = payload
        .to_amount
        .parse()
        .map_err(|_| ValidationError::MalformedPayload("to_amount is not a valid integer".into()))?;

    let (to, value, data) = if let Some(contract) = &payload.coin.contract_address {
        let calldata = erc20_transfer_calldata(&payload.to_address, amount)?;
        (parse_address(contract)?, 0u128, calldata)
    } else {
        (parse_address(&payload.to_address)?, amount, Vec::new())
    };

    Ok(ResolvedEvmFields {
        chain_id: *chain_id,
        nonce: *nonce,
        priority_fee_wei: *priority_fee_wei,
        max_fee_wei: *max_fee_wei,
        gas_limit: *gas_limit,
        to,
        value,
        data,
    })
}

/// Returns `(unsigned_tx_bytes, digest)` for a native-ETH or ERC-20 transfer
/// (§4.3 EVM row). One digest — EVM has exactly one pre-image.
pub fn pre_signing_hash(payload: &KeysignPayload) -> Result<(Vec<u8>, [u8; 32]), ValidationError> {
    let f = resolve_fields(payload)?;
    let unsigned_tx = encode_eip1559(f.chain_id, f.nonce, f.priority_fee_wei, f.max_fee_wei, f.gas_limit, &f.to, f.value, &f.data);
    let digest: [u8; 32] = Keccak256::digest(&unsigned_tx).into();
    Ok((unsigned_tx, digest))
}

/// The separate prior digest for a pending `erc20_approve_payload`, signed
/// in the same session before the main payload (§4.3 decision table edge).
pub fn approve_pre_signing_hash(
    payload: &KeysignPayload,
    approve: &Erc20ApprovePayload,
) -> Result<(Vec<u8>, [u8; 32]), ValidationError> {
    let BlockchainSpecific::Evm { max_fee_wei, priority_fee_wei, nonce, gas_limit, chain_id } =
        &payload.blockchain_specific
    else {
        return Err(ValidationError::MalformedPayload(
            "EVM pre-signing requires BlockchainSpecific::Evm".into(),
        ));
    };
    let contract = payload
        .coin
        .contract_address
        .as_ref()
        .ok_or_else(|| ValidationError::MalformedPayload("approve requires an ERC-20 contract".into()))?;
    let to = parse_address(contract)?;
    let calldata = erc20_approve_calldata(approve)?;
    let unsigned_tx = encode_eip1559(*chain_id, *nonce, *priority_fee_wei, *max_fee_wei, *gas_limit, &to, 0, &calldata);
    let digest: [u8; 32] = Keccak256::digest(&unsigned_tx).into();
    Ok((unsigned_tx, digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::{AccountCoin, ChainDescriptor, LibType, PartyId};

    fn s1_payload() -> KeysignPayload {
        KeysignPayload {
            coin: AccountCoin {
                chain: ChainDescriptor::Evm { chain_id: 1 },
                address: "0x0000000000000000000000000000000000000000".into(),
                ticker: "ETH".into(),
                decimals: 18,
                contract_address: None,
                is_native: true,
            },
            to_address: "0x65261c9d3b49367e6a49902B1e735b2e734F8ee7".into(),
            to_amount: "100000000000000".into(),
            memo: None,
            vault_public_key_ecdsa: [0x02; 33],
            vault_local_party_id: PartyId::from("party-1"),
            lib_type: LibType::Dkls,
            utxo_info: None,
            blockchain_specific: BlockchainSpecific::Evm {
                max_fee_wei: 20_000_000_000,
                priority_fee_wei: 2_000_000_000,
                nonce: 122,
                gas_limit: 21_000,
                chain_id: 1,
            },
            swap_payload: None,
            erc20_approve_payload: None,
        }
    }

    #[test]
    fn s1_evm_native_send_digest_is_deterministic() {
        let payload = s1_payload();
        let (_, digest_a) = pre_signing_hash(&payload).unwrap();
        let (_, digest_b) = pre_signing_hash(&payload).unwrap();
        assert_eq!(digest_a, digest_b);
    }

    #[test]
    fn erc20_transfer_calldata_matches_selector_and_layout() {
        let calldata = erc20_transfer_calldata("0x65261c9d3b49367e6a49902B1e735b2e734F8ee7", 42).unwrap();
        assert_eq!(calldata.len(), 4 + 32 + 32);
        assert_eq!(&calldata[0..4], &ERC20_TRANSFER_SELECTOR);
        assert_eq!(calldata[4..24], [0u8; 20]); // left-padded zero region of the address word
        assert_eq!(*calldata.last().unwrap(), 42);
    }
}
