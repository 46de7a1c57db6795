//! BIP143 signature hash for segwit v0 programs.

use btctx_primitives::hash::sha256d;
use btctx_primitives::util::ByteWriter;
use btctx_script::Script;

use super::{check_input_index, SighashCache, SIGHASH_ANYONECANPAY, SIGHASH_MASK, SIGHASH_NONE, SIGHASH_SINGLE};
use crate::transaction::Transaction;
use crate::TransactionError;

/// Script code signed for a P2WPKH program: the equivalent P2PKH script.
///
/// # Returns
/// The 25-byte P2PKH script, or `None` if `script` is not a P2WPKH program.
pub fn p2wpkh_script_code(script: &Script) -> Option<Script> {
    if !script.is_p2wpkh() {
        return None;
    }
    let hash: [u8; 20] = script.to_bytes()[2..22].try_into().ok()?;
    Some(Script::p2pkh(&hash))
}

/// Compute the BIP143 signature hash for a segwit v0 input.
///
/// The preimage consists of:
/// 1. nVersion (4 bytes LE)
/// 2. hashPrevouts (32 bytes), zero with ANYONECANPAY
/// 3. hashSequence (32 bytes), zero with ANYONECANPAY, SINGLE or NONE
/// 4. outpoint (32+4 bytes)
/// 5. scriptCode (varint + script)
/// 6. value (8 bytes LE) of the output being spent
/// 7. nSequence (4 bytes LE)
/// 8. hashOutputs (32 bytes): all outputs, the matching output for SINGLE, or zero
/// 9. nLocktime (4 bytes LE)
/// 10. sighash type (4 bytes LE)
///
/// # Arguments
/// * `tx`          - The transaction being signed.
/// * `cache`       - Hashes precomputed for `tx`.
/// * `input_index` - Index of the input being signed.
/// * `subscript`   - The P2WPKH program or the P2WSH witness script. A P2WPKH
///                   program is replaced by its P2PKH script code.
/// * `amount`      - Satoshi value of the output being spent.
/// * `sighash_type`- The hash type.
///
/// # Returns
/// A 32-byte double-SHA256 digest to be signed by ECDSA.
pub fn segwit_v0_signature_hash(
    tx: &Transaction,
    cache: &SighashCache,
    input_index: usize,
    subscript: &Script,
    amount: u64,
    sighash_type: u32,
) -> Result<[u8; 32], TransactionError> {
    check_input_index(tx, input_index)?;

    let base_type = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;
    let zero = [0u8; 32];

    let hash_prevouts = if anyone_can_pay { zero } else { cache.hash_prevouts_v0() };

    let hash_sequence = if !anyone_can_pay && base_type != SIGHASH_SINGLE && base_type != SIGHASH_NONE {
        cache.hash_sequence_v0()
    } else {
        zero
    };

    let hash_outputs = if base_type != SIGHASH_SINGLE && base_type != SIGHASH_NONE {
        cache.hash_outputs_v0()
    } else if base_type == SIGHASH_SINGLE && input_index < tx.outputs.len() {
        sha256d(&tx.outputs[input_index].to_bytes())
    } else {
        zero
    };

    let script_code = p2wpkh_script_code(subscript).unwrap_or_else(|| subscript.clone());
    let input = &tx.inputs[input_index];

    let mut writer = ByteWriter::with_capacity(256);
    writer.write_u32_le(tx.version);
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);
    input.write_outpoint(&mut writer);
    writer.write_var_bytes(script_code.to_bytes());
    writer.write_u64_le(amount);
    writer.write_u32_le(input.sequence_number);
    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);

    Ok(sha256d(writer.as_bytes()))
}
