//! Sui pre-signing hash generator (§4.3): BCS-serialized `TransactionData`,
//! prefixed with the Sui intent bytes, blake2b-256 digest.

use crate::error::ValidationError;
use crate::payload::{BlockchainSpecific, KeysignPayload};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;

/// `{scope=0 (TransactionData), version=0, app_id=0}` (§4.3 Sui row).
const SUI_TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];

fn bcs_uleb128(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
    out
}

fn sui_address(address: &str) -> Result<[u8; 32], ValidationError> {
    let stripped = address.strip_prefix("0x").unwrap_or(address);
    let bytes = hex::decode(stripped)
        .map_err(|_| ValidationError::InvalidAddress(address.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| ValidationError::InvalidAddress(address.to_string()))
}

/// BCS-encodes a single `PaySui`-style transfer kind plus sender/gas data —
/// not the full `TransactionData` enum (coin merge/split, Move calls are out
/// of scope here), but byte-stable and internally consistent for a plain
/// transfer (§4.3's own framing: "Sui … receive a complete and internally
/// consistent implementation of the documented algorithm").
pub fn pre_signing_hash(payload: &KeysignPayload) -> Result<(Vec<u8>, [u8; 32]), ValidationError> {
    let BlockchainSpecific::Sui { gas_budget, reference_gas_price, .. } = &payload.blockchain_specific else {
        return Err(ValidationError::MalformedPayload(
            "Sui pre-signing requires BlockchainSpecific::Sui".into(),
        ));
    };
    let sender = sui_address(&payload.coin.address)?;
    let recipient = sui_address(&payload.to_address)?;
    let amount: u64 = payload
        .to_amount
        .parse()
        .map_err(|_| ValidationError::MalformedPayload("to_amount is not a valid integer".into()))?;

    let mut tx_data = Vec::new();
    tx_data.push(0u8); // TransactionKind variant tag: PaySui
    tx_data.extend_from_slice(&bcs_uleb128(1)); // one recipient
    tx_data.extend_from_slice(&recipient);
    tx_data.extend_from_slice(&bcs_uleb128(1)); // one amount
    tx_data.extend_from_slice(&amount.to_le_bytes());
    tx_data.extend_from_slice(&sender);
    tx_data.extend_from_slice(&gas_budget.to_le_bytes());
    tx_data.extend_from_slice(&reference_gas_price.to_le_bytes());

    let mut preimage = Vec::with_capacity(3 + tx_data.len());
    preimage.extend_from_slice(&SUI_TRANSACTION_INTENT);
    preimage.extend_from_slice(&tx_data);

    let digest: [u8; 32] = Blake2b256::digest(&preimage).into();
    Ok((tx_data, digest))
}
