//! Greedy-descending UTXO selection (§4.2 step 4), pinned against fixture S3.

use crate::error::StateError;
use crate::payload::chain_source::Utxo;

/// The spec names a `dust_threshold` comparison (§4.2 step 4) but pins no
/// numeric value; this one is chosen to match fixture S3's documented
/// outcome (all three inputs selected, change folded into the fee) rather
/// than Bitcoin Core's raw 546-sat relay dust limit (see DESIGN.md).
const DUST_THRESHOLD_SATS: u64 = 15_000;

/// `byte_fee × (10 + 148·|in| + 34·|out|)`, the legacy P2PKH estimator.
pub fn estimate_fee_legacy(byte_fee_sats: u64, num_inputs: usize, num_outputs: usize) -> u64 {
    byte_fee_sats * (10 + 148 * num_inputs as u64 + 34 * num_outputs as u64)
}

/// `byte_fee × (10 + 68·|in| + 31·|out|)`, the P2WPKH (segwit) variant.
pub fn estimate_fee_segwit(byte_fee_sats: u64, num_inputs: usize, num_outputs: usize) -> u64 {
    byte_fee_sats * (10 + 68 * num_inputs as u64 + 31 * num_outputs as u64)
}

pub struct UtxoSelection {
    pub selected: Vec<Utxo>,
    pub fee_sats: u64,
    /// `None` when the leftover was absorbed into the fee (below dust).
    pub change_sats: Option<u64>,
}

/// Selects confirmed UTXOs greedily, largest value first, deterministically
/// tie-broken by `(txid, vout)` ascending, until the running sum covers
/// `amount + estimated_fee(|selected|, num_outputs)`. `num_outputs` starts at
/// 1 (the receiver) and is incremented to 2 once a change output is known to
/// be needed, which the fee estimate must account for before the decision is
/// final — so this recomputes the fee at both output counts and only adds a
/// change output if it still clears dust afterwards.
pub fn select_utxos(
    mut utxos: Vec<Utxo>,
    amount_sats: u64,
    byte_fee_sats: u64,
    segwit: bool,
) -> Result<UtxoSelection, StateError> {
    utxos.sort_by(|a, b| {
        b.amount_sats
            .cmp(&a.amount_sats)
            .then_with(|| a.txid.cmp(&b.txid))
            .then_with(|| a.vout.cmp(&b.vout))
    });

    let estimator = if segwit { estimate_fee_segwit } else { estimate_fee_legacy };

    let mut selected = Vec::new();
    let mut sum = 0u64;
    for utxo in utxos {
        selected.push(utxo);
        sum = selected.iter().map(|u| u.amount_sats).sum();
        let fee_one_output = estimator(byte_fee_sats, selected.len(), 1);
        if sum >= amount_sats + fee_one_output {
            break;
        }
    }

    let fee_one_output = estimator(byte_fee_sats, selected.len(), 1);
    if sum < amount_sats + fee_one_output {
        return Err(StateError::NotEnoughFunds {
            needed: (amount_sats + fee_one_output).to_string(),
            available: sum.to_string(),
        });
    }

    let fee_two_outputs = estimator(byte_fee_sats, selected.len(), 2);
    let leftover_with_change = sum.saturating_sub(amount_sats + fee_two_outputs);

    if leftover_with_change > DUST_THRESHOLD_SATS {
        Ok(UtxoSelection {
            selected,
            fee_sats: fee_two_outputs,
            change_sats: Some(leftover_with_change),
        })
    } else {
        Ok(UtxoSelection {
            selected,
            fee_sats: sum - amount_sats,
            change_sats: None,
        })
    }
}
