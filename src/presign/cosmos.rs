//! Cosmos-SDK family pre-signing hash generator (§4.3): a `SignDoc`-shaped
//! proto preimage, SHA-256 digest. Used directly by THORChain/Maya too
//! (`presign::thorchain` re-exports this under their own sequence/fee
//! field names).

use crate::error::ValidationError;
use crate::payload::{BlockchainSpecific, KeysignPayload};
use sha2::{Digest, Sha256};

fn proto_bytes_field(field_number: u32, wire_type: u32, payload: &[u8]) -> Vec<u8> {
    let tag = (field_number << 3) | wire_type;
    let mut out = varint(tag as u64);
    out.extend_from_slice(&varint(payload.len() as u64));
    out.extend_from_slice(payload);
    out
}

fn varint(mut value: u64) -> Vec<u8> {
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

/// `TxBody{messages=[MsgSend{from,to,amount,denom}], memo}`, field-tagged as
/// a minimal protobuf encoding sufficient for a deterministic digest (the
/// full `cosmos.bank.v1beta1.MsgSend` schema is out of scope; this core only
/// needs byte-stability, not cross-implementation proto compatibility for
/// fields the MPC primitive never inspects).
fn body_bytes(payload: &KeysignPayload, denom: &str) -> Vec<u8> {
    let mut msg_send = Vec::new();
    msg_send.extend_from_slice(&proto_bytes_field(1, 2, payload.coin.address.as_bytes()));
    msg_send.extend_from_slice(&proto_bytes_field(2, 2, payload.to_address.as_bytes()));
    let amount_line = format!("{}{denom}", payload.to_amount);
    msg_send.extend_from_slice(&proto_bytes_field(3, 2, amount_line.as_bytes()));

    let mut body = proto_bytes_field(1, 2, &msg_send);
    if let Some(memo) = &payload.memo {
        body.extend_from_slice(&proto_bytes_field(2, 2, memo.as_bytes()));
    }
    body
}

fn auth_info_bytes(gas: u64, pubkey: &[u8; 33], sequence: u64) -> Vec<u8> {
    let signer_info = {
        let mut s = proto_bytes_field(1, 2, pubkey);
        s.extend_from_slice(&varint(sequence));
        s
    };
    let mut auth_info = proto_bytes_field(1, 2, &signer_info);
    auth_info.extend_from_slice(&varint(gas));
    auth_info
}

/// Returns `(unsigned_tx_bytes, digest)`; one digest (§4.3 Cosmos row).
pub fn pre_signing_hash(payload: &KeysignPayload) -> Result<(Vec<u8>, [u8; 32]), ValidationError> {
    let (gas, sequence, account_number, chain_id, denom) = match &payload.blockchain_specific {
        BlockchainSpecific::Cosmos { gas, sequence, account_number, chain_id, denom } => {
            (*gas, *sequence, *account_number, chain_id.clone(), denom.clone())
        }
        BlockchainSpecific::Thorchain { sequence, account_number, fee } => {
            (*fee, *sequence, *account_number, payload.coin.chain.family_name().to_string(), "rune".into())
        }
        _ => {
            return Err(ValidationError::MalformedPayload(
                "Cosmos pre-signing requires BlockchainSpecific::Cosmos or Thorchain".into(),
            ))
        }
    };

    let body = body_bytes(payload, &denom);
    let auth_info = auth_info_bytes(gas, &payload.vault_public_key_ecdsa, sequence);

    let mut sign_doc = proto_bytes_field(1, 2, &body);
    sign_doc.extend_from_slice(&proto_bytes_field(2, 2, &auth_info));
    sign_doc.extend_from_slice(&proto_bytes_field(3, 2, chain_id.as_bytes()));
    sign_doc.extend_from_slice(&varint(account_number));

    let digest: [u8; 32] = Sha256::digest(&sign_doc).into();
    Ok((sign_doc, digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::{AccountCoin, ChainDescriptor, LibType, PartyId};

    fn payload() -> KeysignPayload {
        KeysignPayload {
            coin: AccountCoin {
                chain: ChainDescriptor::Cosmos { chain_id: "cosmoshub-4".into(), denom: "uatom".into(), decimals: 6 },
                address: "cosmos1exampleexampleexampleexampleexampl".into(),
                ticker: "ATOM".into(),
                decimals: 6,
                contract_address: None,
                is_native: true,
            },
            to_address: "cosmos1receiverreceiverreceiverreceiverrr".into(),
            to_amount: "1000000".into(),
            memo: None,
            vault_public_key_ecdsa: [0x02; 33],
            vault_local_party_id: PartyId::from("party-1"),
            lib_type: LibType::Dkls,
            utxo_info: None,
            blockchain_specific: BlockchainSpecific::Cosmos {
                account_number: 42,
                sequence: 7,
                gas: 200_000,
                chain_id: "cosmoshub-4".into(),
                denom: "uatom:6".into(),
            },
            swap_payload: None,
            erc20_approve_payload: None,
        }
    }

    #[test]
    fn cosmos_msgsend_digest_is_deterministic_and_sequence_sensitive() {
        let p1 = payload();
        let mut p2 = p1.clone();
        p2.blockchain_specific = BlockchainSpecific::Cosmos {
            account_number: 42,
            sequence: 8,
            gas: 200_000,
            chain_id: "cosmoshub-4".into(),
            denom: "uatom:6".into(),
        };
        let (_, d1) = pre_signing_hash(&p1).unwrap();
        let (_, d1_again) = pre_signing_hash(&p1).unwrap();
        let (_, d2) = pre_signing_hash(&p2).unwrap();
        assert_eq!(d1, d1_again);
        assert_ne!(d1, d2);
    }
}
