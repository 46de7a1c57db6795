//! BIP341 signature hash for taproot key-path spends.

use btctx_primitives::hash::{sha256, tagged_hash};
use btctx_primitives::util::ByteWriter;

use super::{
    check_input_index, SighashCache, SIGHASH_ALL, SIGHASH_ANYONECANPAY, SIGHASH_DEFAULT,
    SIGHASH_NONE, SIGHASH_SINGLE,
};
use crate::output::TransactionOutput;
use crate::transaction::Transaction;
use crate::TransactionError;

const EPOCH: u8 = 0x00;

/// Key-path spend without annex.
const SPEND_TYPE_KEY_PATH: u8 = 0x00;

/// Whether `sighash_type` is one of the hash types BIP341 accepts.
pub fn is_valid_taproot_sighash(sighash_type: u32) -> bool {
    matches!(sighash_type, 0x00..=0x03 | 0x81..=0x83)
}

/// Compute the BIP341 signature hash for a key-path spend of input
/// `input_index`.
///
/// # Arguments
/// * `tx`          - The transaction being signed.
/// * `cache`       - Hashes for `tx`, built with [`SighashCache::with_prevouts`].
/// * `input_index` - Index of the input being signed.
/// * `prevouts`    - The output spent by every input, in input order.
/// * `sighash_type`- `SIGHASH_DEFAULT` or an explicit hash type.
///
/// # Returns
/// The `TapSighash` tagged hash, or an error for an invalid hash type, a
/// missing prevout, or SINGLE without a matching output.
pub fn taproot_key_spend_signature_hash(
    tx: &Transaction,
    cache: &SighashCache,
    input_index: usize,
    prevouts: &[TransactionOutput],
    sighash_type: u32,
) -> Result<[u8; 32], TransactionError> {
    check_input_index(tx, input_index)?;
    if !is_valid_taproot_sighash(sighash_type) {
        return Err(TransactionError::InvalidTransaction(format!(
            "invalid taproot sighash type 0x{:02x}",
            sighash_type
        )));
    }
    if prevouts.len() != tx.inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "{} prevouts for {} inputs",
            prevouts.len(),
            tx.inputs.len()
        )));
    }
    let hashes = cache.taproot.as_ref().ok_or_else(|| {
        TransactionError::InvalidTransaction("sighash cache built without prevouts".to_string())
    })?;

    let output_type = if sighash_type == SIGHASH_DEFAULT {
        SIGHASH_ALL
    } else {
        sighash_type & 0x03
    };
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    let mut writer = ByteWriter::with_capacity(256);
    writer.write_u8(EPOCH);

    // Control
    writer.write_u8(sighash_type as u8);
    writer.write_u32_le(tx.version);
    writer.write_u32_le(tx.lock_time);

    // Transaction data
    if !anyone_can_pay {
        writer.write_bytes(&cache.sha_prevouts);
        writer.write_bytes(&hashes.sha_amounts);
        writer.write_bytes(&hashes.sha_script_pubkeys);
        writer.write_bytes(&cache.sha_sequences);
    }
    if output_type != SIGHASH_NONE && output_type != SIGHASH_SINGLE {
        writer.write_bytes(&cache.sha_outputs);
    }

    // Input data
    writer.write_u8(SPEND_TYPE_KEY_PATH);
    let input = &tx.inputs[input_index];
    if anyone_can_pay {
        let prevout = &prevouts[input_index];
        input.write_outpoint(&mut writer);
        writer.write_u64_le(prevout.satoshis);
        writer.write_var_bytes(prevout.locking_script.to_bytes());
        writer.write_u32_le(input.sequence_number);
    } else {
        writer.write_u32_le(input_index as u32);
    }

    // Output data
    if output_type == SIGHASH_SINGLE {
        let output = tx.outputs.get(input_index).ok_or_else(|| {
            TransactionError::InvalidTransaction(format!(
                "SIGHASH_SINGLE input {} has no matching output",
                input_index
            ))
        })?;
        writer.write_bytes(&sha256(&output.to_bytes()));
    }

    Ok(tagged_hash("TapSighash", &[writer.as_bytes()]))
}
