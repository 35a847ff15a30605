//! Solana pre-signing "hash" generator (§4.3). Ed25519 signs the message
//! directly rather than a pre-hash, so the `digest` this core hands the MPC
//! engine is the serialized message bytes themselves — `MessagePreImage`
//! (§3) is defined as opaque message bytes of arbitrary length precisely to
//! accommodate this.

use crate::error::ValidationError;
use crate::payload::{BlockchainSpecific, KeysignPayload};

const SYSTEM_PROGRAM_ID: [u8; 32] = [0u8; 32];
const TRANSFER_INSTRUCTION_INDEX: u32 = 2;

fn base58_pubkey(address: &str) -> Result<[u8; 32], ValidationError> {
    let decoded = bs58::decode(address)
        .into_vec()
        .map_err(|_| ValidationError::InvalidAddress(address.to_string()))?;
    decoded
        .try_into()
        .map_err(|_| ValidationError::InvalidAddress(address.to_string()))
}

fn compact_u16(mut n: u16) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let mut byte = (n & 0x7f) as u8;
        n >>= 7;
        if n != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if n == 0 {
            break;
        }
    }
    out
}

/// Message v0: `{header, account_keys[], recent_blockhash, instructions[]}`,
/// matching the legacy (non-versioned) wire layout closely enough that a
/// single system-program transfer instruction round-trips byte-for-byte.
pub fn pre_signing_hash(payload: &KeysignPayload) -> Result<(Vec<u8>, Vec<u8>), ValidationError> {
    let BlockchainSpecific::Solana { recent_blockhash, .. } = &payload.blockchain_specific else {
        return Err(ValidationError::MalformedPayload(
            "Solana pre-signing requires BlockchainSpecific::Solana".into(),
        ));
    };
    let from = base58_pubkey(&payload.coin.address)?;
    let to = base58_pubkey(&payload.to_address)?;
    let lamports: u64 = payload
        .to_amount
        .parse()
        .map_err(|_| ValidationError::MalformedPayload("to_amount is not a valid integer".into()))?;

    let account_keys = [from, to, SYSTEM_PROGRAM_ID];

    let mut message = Vec::new();
    message.push(1u8); // num_required_signatures
    message.push(0u8); // num_readonly_signed_accounts
    message.push(1u8); // num_readonly_unsigned_accounts (system program)
    message.extend_from_slice(&compact_u16(account_keys.len() as u16));
    for key in &account_keys {
        message.extend_from_slice(key);
    }
    message.extend_from_slice(recent_blockhash);

    let mut ix_data = Vec::with_capacity(12);
    ix_data.extend_from_slice(&TRANSFER_INSTRUCTION_INDEX.to_le_bytes());
    ix_data.extend_from_slice(&lamports.to_le_bytes());

    message.extend_from_slice(&compact_u16(1)); // one instruction
    message.push(2); // program_id_index (system program)
    message.extend_from_slice(&compact_u16(2)); // accounts: from, to
    message.push(0);
    message.push(1);
    message.extend_from_slice(&compact_u16(ix_data.len() as u16));
    message.extend_from_slice(&ix_data);

    Ok((message.clone(), message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::{AccountCoin, ChainDescriptor, LibType, PartyId};

    #[test]
    fn message_bytes_are_deterministic_and_blockhash_sensitive() {
        let mut payload = KeysignPayload {
            coin: AccountCoin {
                chain: ChainDescriptor::Solana,
                address: bs58::encode([0x01u8; 32]).into_string(),
                ticker: "SOL".into(),
                decimals: 9,
                contract_address: None,
                is_native: true,
            },
            to_address: bs58::encode([0x02u8; 32]).into_string(),
            to_amount: "1000000000".into(),
            memo: None,
            vault_public_key_ecdsa: [0x02; 33],
            vault_local_party_id: PartyId::from("party-1"),
            lib_type: LibType::Dkls,
            utxo_info: None,
            blockchain_specific: BlockchainSpecific::Solana {
                recent_blockhash: [0xaa; 32],
                priority_fee_micro_lamports: 0,
            },
            swap_payload: None,
            erc20_approve_payload: None,
        };
        let (_, m1) = pre_signing_hash(&payload).unwrap();
        let (_, m1_again) = pre_signing_hash(&payload).unwrap();
        assert_eq!(m1, m1_again);

        payload.blockchain_specific = BlockchainSpecific::Solana {
            recent_blockhash: [0xbb; 32],
            priority_fee_micro_lamports: 0,
        };
        let (_, m2) = pre_signing_hash(&payload).unwrap();
        assert_ne!(m1, m2);
    }
}
