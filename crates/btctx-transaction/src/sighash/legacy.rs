//! Pre-segwit signature hash.

use btctx_primitives::hash::sha256d;
use btctx_primitives::util::{ByteWriter, VarInt};
use btctx_script::Script;

use super::{check_input_index, SIGHASH_ANYONECANPAY, SIGHASH_MASK, SIGHASH_NONE, SIGHASH_SINGLE};
use crate::transaction::Transaction;
use crate::TransactionError;

/// Digest returned for SIGHASH_SINGLE when the input has no matching output.
///
/// Consensus signs the value `1` here instead of failing.
pub const SIGHASH_SINGLE_BUG: [u8; 32] = {
    let mut one = [0u8; 32];
    one[0] = 0x01;
    one
};

/// Compute the legacy signature hash for one input.
///
/// The transaction is copied with the signed input's scriptSig replaced by
/// `subscript` (with `OP_CODESEPARATOR`s removed) and every other scriptSig
/// emptied, then trimmed according to the hash type, serialized without
/// witnesses, suffixed with the 4-byte hash type and double-hashed.
///
/// # Arguments
/// * `tx`          - The transaction being signed.
/// * `input_index` - Index of the input being signed.
/// * `subscript`   - The locking script (or redeem script) being satisfied.
/// * `sighash_type`- The hash type, e.g. `SIGHASH_ALL`.
///
/// # Returns
/// A 32-byte digest to be signed by ECDSA.
pub fn legacy_signature_hash(
    tx: &Transaction,
    input_index: usize,
    subscript: &Script,
    sighash_type: u32,
) -> Result<[u8; 32], TransactionError> {
    check_input_index(tx, input_index)?;

    let base_type = sighash_type & SIGHASH_MASK;
    if base_type == SIGHASH_SINGLE && input_index >= tx.outputs.len() {
        return Ok(SIGHASH_SINGLE_BUG);
    }

    let script_code = subscript.remove_op_codeseparators();
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    let mut writer = ByteWriter::with_capacity(256);
    writer.write_u32_le(tx.version);

    // Inputs
    if anyone_can_pay {
        writer.write_varint(VarInt::from(1u64));
        let input = &tx.inputs[input_index];
        input.write_outpoint(&mut writer);
        writer.write_var_bytes(script_code.to_bytes());
        writer.write_u32_le(input.sequence_number);
    } else {
        writer.write_varint(VarInt::from(tx.inputs.len()));
        for (i, input) in tx.inputs.iter().enumerate() {
            input.write_outpoint(&mut writer);
            if i == input_index {
                writer.write_var_bytes(script_code.to_bytes());
                writer.write_u32_le(input.sequence_number);
            } else {
                writer.write_varint(VarInt::from(0u64));
                let sequence = if base_type == SIGHASH_NONE || base_type == SIGHASH_SINGLE {
                    0
                } else {
                    input.sequence_number
                };
                writer.write_u32_le(sequence);
            }
        }
    }

    // Outputs
    match base_type {
        SIGHASH_NONE => writer.write_varint(VarInt::from(0u64)),
        SIGHASH_SINGLE => {
            writer.write_varint(VarInt::from(input_index + 1));
            for _ in 0..input_index {
                writer.write_u64_le(u64::MAX);
                writer.write_varint(VarInt::from(0u64));
            }
            tx.outputs[input_index].write_to(&mut writer);
        }
        _ => {
            writer.write_varint(VarInt::from(tx.outputs.len()));
            for output in &tx.outputs {
                output.write_to(&mut writer);
            }
        }
    }

    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);
    Ok(sha256d(writer.as_bytes()))
}
