//! Attach the spent-output metadata each input type needs before signing.

use btctx_script::AddressType;
use tracing::debug;

use crate::envelope::{Envelope, EnvelopeInput};
use crate::inout::{TxInput, TxInputs};
use crate::sighash::{SIGHASH_ALL, SIGHASH_DEFAULT};
use crate::TransactionError;

/// Decorate every envelope input from the matching builder input.
///
/// Legacy inputs get the full prior transaction. Segwit v0 inputs get the
/// full prior transaction when known, plus the spent output and an explicit
/// `SIGHASH_ALL`, and any redeem or witness script the builder input
/// carries. Taproot inputs get only the spent output and `SIGHASH_DEFAULT`.
/// Scripts the builder did not know are left for the signer, which derives
/// them from the signing key.
///
/// A legacy input whose prior transaction is unknown is left bare; signing
/// rejects it until the transaction is attached.
///
/// # Returns
/// `Ok(())`, or `Configuration` when the counts differ.
pub fn decorate_inputs(envelope: &mut Envelope, inputs: &TxInputs) -> Result<(), TransactionError> {
    if envelope.inputs.len() != inputs.len() {
        return Err(TransactionError::Configuration(format!(
            "{} envelope inputs for {} builder inputs",
            envelope.inputs.len(),
            inputs.len()
        )));
    }
    for (index, (slot, input)) in envelope.inputs.iter_mut().zip(inputs.iter()).enumerate() {
        decorate_input(slot, input);
        debug!(
            index,
            address_type = %input.address_type(),
            full_tx = slot.non_witness_utxo.is_some(),
            redeem = slot.redeem_script.is_some(),
            "decorated input"
        );
    }
    Ok(())
}

fn decorate_input(slot: &mut EnvelopeInput, input: &TxInput) {
    match input.address_type() {
        AddressType::P2pk | AddressType::P2pkh => {
            slot.non_witness_utxo = input.prev_tx.clone();
        }
        AddressType::P2wpkh
        | AddressType::P2wpkhNested
        | AddressType::P2wsh
        | AddressType::P2wshNested => {
            slot.non_witness_utxo = input.prev_tx.clone();
            slot.witness_utxo = Some(input.prev_output.clone());
            slot.sighash_type = Some(SIGHASH_ALL);
            slot.redeem_script = input.redeem_script.clone();
            slot.witness_script = input.witness_script.clone();
        }
        AddressType::P2tr => {
            slot.witness_utxo = Some(input.prev_output.clone());
            slot.sighash_type = Some(SIGHASH_DEFAULT);
        }
    }
}
