//! Virtual-size estimation, fee calculation and the funding loop.
//!
//! Unsigned inputs have no scriptSig or witness yet, so their signed size
//! is estimated per address type. Outputs are sized exactly from their
//! locking scripts; a prospective change output is sized from the change
//! address type.

use btctx_primitives::util::VarInt;
use btctx_script::{Address, AddressType};
use tracing::debug;

use crate::inout::{TxInput, TxInputs, TxOutputs};
use crate::output::output_size;
use crate::selection::select_utxos;
use crate::transaction::WITNESS_SCALE_FACTOR;
use crate::utxo::Utxo;
use crate::TransactionError;

/// Estimated signed scriptSig and witness sizes for one input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputSize {
    /// scriptSig length in bytes, without its length prefix.
    pub script_sig: usize,
    /// Serialized witness size in bytes, including the item count.
    /// Zero for inputs without a witness.
    pub witness: usize,
}

/// Worst-case ECDSA signature push: 72-byte DER plus the hash type byte.
const ECDSA_SIG_PUSH: usize = 1 + 73;
/// Compressed public key push.
const PUBKEY_PUSH: usize = 1 + 33;

/// Signed size of an input spending an output of `address_type`.
///
/// P2WSH sizes assume the single-key witness script `<pubkey> OP_CHECKSIG`.
pub fn input_size(address_type: AddressType) -> InputSize {
    match address_type {
        AddressType::P2pk => InputSize { script_sig: ECDSA_SIG_PUSH - 1, witness: 0 },
        AddressType::P2pkh => InputSize { script_sig: ECDSA_SIG_PUSH + PUBKEY_PUSH - 1, witness: 0 },
        AddressType::P2wpkh => InputSize { script_sig: 0, witness: 1 + ECDSA_SIG_PUSH - 1 + PUBKEY_PUSH },
        AddressType::P2wpkhNested => InputSize { script_sig: 23, witness: 1 + ECDSA_SIG_PUSH - 1 + PUBKEY_PUSH },
        AddressType::P2wsh => InputSize { script_sig: 0, witness: 1 + ECDSA_SIG_PUSH - 1 + 1 + 35 },
        AddressType::P2wshNested => InputSize { script_sig: 35, witness: 1 + ECDSA_SIG_PUSH - 1 + 1 + 35 },
        AddressType::P2tr => InputSize { script_sig: 0, witness: 1 + 1 + 64 },
    }
}

/// Estimate the signed virtual size of a transaction.
///
/// # Arguments
/// * `inputs` - Address type of each input's prior output.
/// * `output_script_lens` - Locking-script length of each output.
///
/// # Returns
/// `ceil((base_size * 3 + total_size) / 4)`.
pub fn estimate_vsize(inputs: &[AddressType], output_script_lens: &[usize]) -> u64 {
    let sizes: Vec<InputSize> = inputs.iter().copied().map(input_size).collect();
    let has_witness = sizes.iter().any(|s| s.witness > 0);

    let base_size = 8
        + VarInt::from(sizes.len()).length()
        + sizes
            .iter()
            .map(|s| 36 + VarInt::from(s.script_sig).length() + s.script_sig + 4)
            .sum::<usize>()
        + VarInt::from(output_script_lens.len()).length()
        + output_script_lens.iter().map(|len| output_size(*len)).sum::<usize>();

    let witness_size = if has_witness {
        // Marker and flag, then one stack per input (empty stacks are one byte).
        2 + sizes.iter().map(|s| s.witness.max(1)).sum::<usize>()
    } else {
        0
    };

    let weight = base_size * (WITNESS_SCALE_FACTOR - 1) + base_size + witness_size;
    weight.div_ceil(WITNESS_SCALE_FACTOR) as u64
}

/// `ceil(vsize * fee_rate)` in satoshis, for a rate in sat/vbyte.
pub fn calculate_fee(vsize: u64, fee_rate: f64) -> u64 {
    (vsize as f64 * fee_rate).ceil() as u64
}

/// Estimate the fee for a transaction of the given shape.
pub fn estimate_fee(inputs: &[AddressType], output_script_lens: &[usize], fee_rate: f64) -> u64 {
    calculate_fee(estimate_vsize(inputs, output_script_lens), fee_rate)
}

/// Check that a fee rate is a finite, non-negative number.
pub fn validate_fee_rate(fee_rate: f64) -> Result<(), TransactionError> {
    if !fee_rate.is_finite() || fee_rate < 0.0 {
        return Err(TransactionError::Configuration(format!(
            "invalid fee rate {}",
            fee_rate
        )));
    }
    Ok(())
}

/// Result of a successful funding run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Funding {
    /// The fee paid, in satoshis.
    pub fee: u64,
    /// Value of the change output, zero when none was added.
    pub change: u64,
    /// Estimated virtual size including the change output.
    pub vsize: u64,
    /// Number of fee estimates performed.
    pub rounds: usize,
}

/// Balance inputs against outputs plus fee, adding inputs and change.
///
/// Each round estimates the fee for the current inputs, the outputs and a
/// change output to `change`. With `remainder = inputs - outputs - fee`:
/// a non-negative remainder ends the loop, adding a change output only
/// when it is positive; a negative remainder selects UTXOs worth the
/// shortfall from `pool`, owned by `from`, and loops. Every round either
/// shrinks the pool or fails, so the loop ends within `pool.len() + 1`
/// rounds.
///
/// # Arguments
/// * `inputs`   - Inputs selected so far; new inputs are appended.
/// * `outputs`  - Requested outputs; the change output is appended.
/// * `change`   - Address receiving the remainder.
/// * `fee_rate` - Fee rate in sat/vbyte.
/// * `pool`     - Unselected UTXOs; selected ones are removed.
/// * `from`     - Owner of the pool UTXOs.
///
/// # Returns
/// The funding summary, or `InsufficientFunds` with the totals of the
/// last round when the pool cannot cover the shortfall.
pub fn fund_transaction(
    inputs: &mut TxInputs,
    outputs: &mut TxOutputs,
    change: &Address,
    fee_rate: f64,
    pool: &mut Vec<Utxo>,
    from: Option<&Address>,
) -> Result<Funding, TransactionError> {
    validate_fee_rate(fee_rate)?;
    let mut rounds = 0;
    loop {
        rounds += 1;
        let mut script_lens = outputs.script_lens();
        script_lens.push(change.address_type.script_len());
        let vsize = estimate_vsize(&inputs.address_types(), &script_lens);
        let fee = calculate_fee(vsize, fee_rate);

        let total_in = inputs.amount_total()?;
        let total_out = outputs.amount_total()?;
        let needed = total_out.checked_add(fee).ok_or_else(|| {
            TransactionError::Configuration("output total overflows".to_string())
        })?;
        debug!(round = rounds, total_in, total_out, fee, vsize, pool = pool.len(), "funding round");

        if total_in >= needed {
            let remainder = total_in - needed;
            if remainder > 0 {
                outputs.add_change(change.script.clone(), remainder);
            }
            return Ok(Funding {
                fee,
                change: remainder,
                vsize,
                rounds,
            });
        }

        let insufficient = TransactionError::InsufficientFunds {
            inputs: total_in,
            outputs: total_out,
            fee,
        };
        if pool.is_empty() {
            return Err(insufficient);
        }
        let from = from.ok_or_else(|| {
            TransactionError::Configuration("a from address is required to add inputs".to_string())
        })?;

        let shortfall = needed - total_in;
        match select_utxos(std::mem::take(pool), shortfall) {
            Ok(selection) => {
                *pool = selection.unselected;
                for utxo in selection.selected {
                    debug!(txid = %utxo.txid, vout = utxo.vout, value = utxo.value, "adding input");
                    inputs.push(TxInput::from_utxo(utxo, from)?);
                }
            }
            Err(failure) => {
                debug!(shortfall, available = failure.available, "selection failed");
                *pool = failure.pool;
                return Err(insufficient);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_sizes() {
        assert_eq!(input_size(AddressType::P2pkh), InputSize { script_sig: 107, witness: 0 });
        assert_eq!(input_size(AddressType::P2pk).script_sig, 73);
        assert_eq!(input_size(AddressType::P2wpkh).witness, 108);
        assert_eq!(input_size(AddressType::P2wpkhNested), InputSize { script_sig: 23, witness: 108 });
        assert_eq!(input_size(AddressType::P2tr).witness, 66);
        assert_eq!(input_size(AddressType::P2wsh).witness, 110);
    }

    #[test]
    fn test_legacy_vsize() {
        // 10 + 1 input (36 + 1 + 107 + 4) + 2 P2PKH outputs (34 each) = 226
        assert_eq!(estimate_vsize(&[AddressType::P2pkh], &[25, 25]), 226);
    }

    #[test]
    fn test_segwit_vsize() {
        // base 10 + 41 + 31 = 82, witness 2 + 108 = 110, weight 82*4 + 110 = 438
        assert_eq!(estimate_vsize(&[AddressType::P2wpkh], &[22]), 110);
        // base 10 + 41 + 43 = 94, witness 2 + 66 = 68, weight 94*4 + 68 = 444
        assert_eq!(estimate_vsize(&[AddressType::P2tr], &[34]), 111);
    }

    #[test]
    fn test_mixed_inputs_count_empty_witness() {
        // base 10 + 148 + 41 + 31 = 230, witness 2 + 1 + 108 = 111, weight 920 + 111 = 1031
        assert_eq!(estimate_vsize(&[AddressType::P2pkh, AddressType::P2wpkh], &[22]), 258);
    }

    #[test]
    fn test_calculate_fee_rounds_up() {
        assert_eq!(calculate_fee(110, 1.0), 110);
        assert_eq!(calculate_fee(110, 1.5), 165);
        assert_eq!(calculate_fee(111, 1.1), 123);
        assert_eq!(calculate_fee(0, 3.0), 0);
    }

    #[test]
    fn test_fee_rate_validation() {
        assert!(validate_fee_rate(0.0).is_ok());
        assert!(validate_fee_rate(-1.0).is_err());
        assert!(validate_fee_rate(f64::NAN).is_err());
        assert!(validate_fee_rate(f64::INFINITY).is_err());
    }
}
