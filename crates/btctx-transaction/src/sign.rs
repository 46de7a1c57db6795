//! Per-input signing and finalization.
//!
//! Signing follows the BIP174 roles. The signer computes the digest for
//! each input's script type, obtains a signature from the [`Signer`]
//! capability and records it as a partial signature (or the taproot
//! key-spend signature). The finalizer then turns the recorded signatures
//! into the consensus scriptSig and witness and clears the partial state.

use btctx_primitives::ec::{PublicKey, Signature};
use btctx_primitives::hash::{hash160, sha256};
use btctx_primitives::schnorr::{tweak_public_key, XOnlyPublicKey};
use btctx_script::chunk::encode_push_datas;
use btctx_script::Script;
use tracing::{debug, info};

use crate::envelope::{Envelope, EnvelopeInput};
use crate::output::TransactionOutput;
use crate::sighash::{
    legacy_signature_hash, segwit_v0_signature_hash, taproot_key_spend_signature_hash, SighashCache,
    SIGHASH_ALL, SIGHASH_DEFAULT,
};
use crate::signer::Signer;
use crate::transaction::Transaction;
use crate::witness::Witness;
use crate::TransactionError;

/// Sign and finalize every input of `envelope` with one key.
///
/// # Arguments
/// * `envelope` - A decorated envelope; every input must carry its spent output.
/// * `signer`   - The signing capability. ECDSA for legacy and segwit v0
///   inputs, BIP340 over the tweaked key for taproot inputs.
/// * `pubkey`   - The untweaked public key owning every input.
///
/// # Returns
/// `Ok(())` once every input is finalized, or the first input's error.
/// Inputs already finalized are left untouched.
pub fn sign_envelope(
    envelope: &mut Envelope,
    signer: &dyn Signer,
    pubkey: &PublicKey,
) -> Result<(), TransactionError> {
    {
        let Envelope {
            unsigned_tx, inputs, ..
        } = &mut *envelope;
        let spent = spent_outputs(unsigned_tx, inputs)?;
        let ctx = SigningContext {
            tx: unsigned_tx,
            cache: SighashCache::with_prevouts(unsigned_tx, &spent)?,
            spent: &spent,
            signer,
            pubkey,
        };
        for (index, input) in inputs.iter_mut().enumerate() {
            if input.is_finalized() {
                continue;
            }
            ctx.sign_input(index, input)?;
        }
    }
    finalize_envelope(envelope)?;
    info!(
        txid = %envelope.unsigned_tx.tx_hash(),
        inputs = envelope.inputs.len(),
        "signed envelope"
    );
    Ok(())
}

/// Finalize every input that has its signatures but no final script yet.
pub fn finalize_envelope(envelope: &mut Envelope) -> Result<(), TransactionError> {
    let spent = spent_outputs(&envelope.unsigned_tx, &envelope.inputs)?;
    for (index, (input, prevout)) in envelope.inputs.iter_mut().zip(&spent).enumerate() {
        if input.is_finalized() {
            continue;
        }
        finalize_input(index, input, &prevout.locking_script)?;
    }
    Ok(())
}

/// Assemble the final scriptSig and witness of one input spending
/// `locking_script`, then drop its partial signatures.
pub fn finalize_input(
    index: usize,
    input: &mut EnvelopeInput,
    locking_script: &Script,
) -> Result<(), TransactionError> {
    let (script_sig, witness) = assemble(index, input, locking_script)?;
    input.final_script_sig = script_sig;
    input.final_script_witness = witness;
    input.partial_sigs.clear();
    input.tap_key_sig = None;
    debug!(index, "finalized input");
    Ok(())
}

/// The output spent by each input, in input order.
pub(crate) fn spent_outputs(
    tx: &Transaction,
    inputs: &[EnvelopeInput],
) -> Result<Vec<TransactionOutput>, TransactionError> {
    if tx.inputs.len() != inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "{} envelope inputs for {} transaction inputs",
            inputs.len(),
            tx.inputs.len()
        )));
    }
    tx.inputs
        .iter()
        .zip(inputs)
        .enumerate()
        .map(|(index, (wire, input))| {
            if !input.has_utxo() {
                return Err(TransactionError::MissingDecoration {
                    index,
                    what: "spent output",
                });
            }
            input
                .spent_output(wire.source_tx_out_index)
                .ok_or(TransactionError::MissingDecoration {
                    index,
                    what: "prior output at the spent index",
                })
        })
        .collect()
}

/// Short human description of a script, for errors and logs.
pub(crate) fn describe(script: &Script) -> String {
    if script.is_data() {
        "OP_RETURN output".to_string()
    } else if script.is_multisig_out() {
        "bare multisig".to_string()
    } else if let Some((version, program)) = script.witness_program() {
        format!("witness v{} program of {} bytes", version, program.len())
    } else {
        format!("script {}", script.to_hex())
    }
}

struct SigningContext<'a> {
    tx: &'a Transaction,
    cache: SighashCache,
    spent: &'a [TransactionOutput],
    signer: &'a dyn Signer,
    pubkey: &'a PublicKey,
}

impl SigningContext<'_> {
    fn sign_input(&self, index: usize, input: &mut EnvelopeInput) -> Result<(), TransactionError> {
        let script = &self.spent[index].locking_script;
        if script.is_p2tr() {
            debug!(index, kind = "p2tr", "signing input");
            self.sign_taproot(index, input, script)
        } else if script.is_p2pk() || script.is_p2pkh() {
            debug!(index, kind = "legacy", "signing input");
            self.sign_legacy(index, input, script)
        } else if script.is_p2sh() {
            debug!(index, kind = "p2sh", "signing input");
            self.sign_nested(index, input, script)
        } else if script.is_p2wpkh() || script.is_p2wsh() {
            debug!(index, kind = "segwit v0", "signing input");
            self.sign_witness_v0(index, input, script)
        } else {
            Err(TransactionError::UnsupportedScript(describe(script)))
        }
    }

    fn sign_legacy(
        &self,
        index: usize,
        input: &mut EnvelopeInput,
        subscript: &Script,
    ) -> Result<(), TransactionError> {
        if input.non_witness_utxo.is_none() {
            return Err(TransactionError::MissingDecoration {
                index,
                what: "prior transaction",
            });
        }
        self.check_owner(index, subscript)?;
        let sighash_type = ecdsa_sighash_type(index, input)?;
        let digest = legacy_signature_hash(self.tx, index, subscript, sighash_type)?;
        self.add_ecdsa_sig(index, input, &digest, sighash_type)
    }

    fn sign_witness_v0(
        &self,
        index: usize,
        input: &mut EnvelopeInput,
        program: &Script,
    ) -> Result<(), TransactionError> {
        if input.witness_utxo.is_none() {
            return Err(TransactionError::MissingDecoration {
                index,
                what: "witness utxo",
            });
        }
        let subscript = if program.is_p2wpkh() {
            self.check_owner(index, program)?;
            program.clone()
        } else {
            let witness_script = self.witness_script(index, input, program)?;
            input.witness_script = Some(witness_script.clone());
            witness_script
        };
        let sighash_type = ecdsa_sighash_type(index, input)?;
        let digest = segwit_v0_signature_hash(
            self.tx,
            &self.cache,
            index,
            &subscript,
            self.spent[index].satoshis,
            sighash_type,
        )?;
        self.add_ecdsa_sig(index, input, &digest, sighash_type)
    }

    fn sign_nested(
        &self,
        index: usize,
        input: &mut EnvelopeInput,
        script: &Script,
    ) -> Result<(), TransactionError> {
        let expected = script.script_hash()?;
        let redeem = match &input.redeem_script {
            Some(redeem) if hash160(redeem.to_bytes()) == expected => redeem.clone(),
            Some(_) => return Err(TransactionError::InvalidRedeemScript { index }),
            None => self
                .derive_redeem_script(&expected)?
                .ok_or(TransactionError::InvalidRedeemScript { index })?,
        };
        input.redeem_script = Some(redeem.clone());

        if redeem.is_p2wpkh() || redeem.is_p2wsh() {
            self.sign_witness_v0(index, input, &redeem)
        } else if redeem.is_p2pk() || redeem.is_p2pkh() {
            self.sign_legacy(index, input, &redeem)
        } else {
            Err(TransactionError::UnsupportedScript(format!(
                "redeem {}",
                describe(&redeem)
            )))
        }
    }

    fn sign_taproot(
        &self,
        index: usize,
        input: &mut EnvelopeInput,
        script: &Script,
    ) -> Result<(), TransactionError> {
        let sighash_type = input.sighash_type.unwrap_or(SIGHASH_DEFAULT);
        let (output_key, _) = tweak_public_key(&XOnlyPublicKey::from(self.pubkey), None)?;
        if script.witness_program().map(|(_, program)| program) != Some(&output_key.as_bytes()[..]) {
            return Err(TransactionError::KeyMismatch { index });
        }

        let digest =
            taproot_key_spend_signature_hash(self.tx, &self.cache, index, self.spent, sighash_type)?;
        let mut sig = self
            .signer
            .sign(&digest)
            .map_err(|e| TransactionError::SignatureFailure {
                index,
                reason: e.to_string(),
            })?;
        if sig.len() != 64 {
            return Err(TransactionError::SignatureFailure {
                index,
                reason: format!("expected a 64-byte schnorr signature, got {} bytes", sig.len()),
            });
        }
        if !output_key.verify(&digest, &sig) {
            return Err(TransactionError::SignatureFailure {
                index,
                reason: "signature does not verify against the output key".to_string(),
            });
        }
        if sighash_type != SIGHASH_DEFAULT {
            sig.push(sighash_type as u8);
        }
        input.tap_key_sig = Some(sig);
        Ok(())
    }

    /// Check that the signing key owns a P2PK, P2PKH or P2WPKH script.
    fn check_owner(&self, index: usize, script: &Script) -> Result<(), TransactionError> {
        let owned = if script.is_p2pkh() {
            script.public_key_hash()? == self.pubkey.hash160()
        } else if script.is_p2pk() {
            script.p2pk_public_key()? == self.pubkey.serialize().as_slice()
        } else if let Some((0, program)) = script.witness_program() {
            program == self.pubkey.hash160().as_slice()
        } else {
            true
        };
        if !owned {
            return Err(TransactionError::KeyMismatch { index });
        }
        Ok(())
    }

    /// The witness script for a P2WSH program: the input's own, or the
    /// single-key script `<pubkey> OP_CHECKSIG`.
    fn witness_script(
        &self,
        index: usize,
        input: &EnvelopeInput,
        program: &Script,
    ) -> Result<Script, TransactionError> {
        let witness_script = match &input.witness_script {
            Some(script) => script.clone(),
            None => Script::p2pk(&self.pubkey.serialize())?,
        };
        if program.witness_program().map(|(_, p)| p) != Some(&sha256(witness_script.to_bytes())[..]) {
            return Err(TransactionError::InvalidWitnessScript { index });
        }
        if !witness_script.is_p2pk() && !witness_script.is_p2pkh() {
            return Err(TransactionError::UnsupportedScript(format!(
                "witness {}",
                describe(&witness_script)
            )));
        }
        self.check_owner(index, &witness_script)?;
        Ok(witness_script)
    }

    /// Find the nested redeem script the signing key can satisfy.
    fn derive_redeem_script(&self, script_hash: &[u8; 20]) -> Result<Option<Script>, TransactionError> {
        let key = self.pubkey.serialize();
        let key_hash = self.pubkey.hash160();
        let p2pk = Script::p2pk(&key)?;
        let candidates = [
            Script::p2wpkh(&key_hash),
            Script::p2wsh(&sha256(p2pk.to_bytes())),
            p2pk,
            Script::p2pkh(&key_hash),
        ];
        Ok(candidates
            .into_iter()
            .find(|candidate| hash160(candidate.to_bytes()) == *script_hash))
    }

    fn add_ecdsa_sig(
        &self,
        index: usize,
        input: &mut EnvelopeInput,
        digest: &[u8; 32],
        sighash_type: u32,
    ) -> Result<(), TransactionError> {
        let der = self
            .signer
            .sign(digest)
            .map_err(|e| TransactionError::SignatureFailure {
                index,
                reason: e.to_string(),
            })?;
        let parsed = Signature::from_der(&der).map_err(|e| TransactionError::SignatureFailure {
            index,
            reason: format!("signer returned an invalid DER signature: {}", e),
        })?;
        if !parsed.verify(digest, self.pubkey) {
            return Err(TransactionError::SignatureFailure {
                index,
                reason: "signature does not verify against the signing key".to_string(),
            });
        }
        let mut sig = der;
        sig.push(sighash_type as u8);
        input.partial_sigs.insert(self.pubkey.serialize(), sig);
        Ok(())
    }
}

fn ecdsa_sighash_type(index: usize, input: &EnvelopeInput) -> Result<u32, TransactionError> {
    let sighash_type = input.sighash_type.unwrap_or(SIGHASH_ALL);
    if sighash_type == SIGHASH_DEFAULT || sighash_type > 0xff {
        return Err(TransactionError::SignatureFailure {
            index,
            reason: format!("sighash type 0x{:x} is not valid for ECDSA", sighash_type),
        });
    }
    Ok(sighash_type)
}

// -----------------------------------------------------------------------
// Finalizer
// -----------------------------------------------------------------------

type FinalScripts = (Option<Script>, Option<Witness>);

fn assemble(index: usize, input: &EnvelopeInput, script: &Script) -> Result<FinalScripts, TransactionError> {
    if script.is_p2tr() {
        let sig = input
            .tap_key_sig
            .clone()
            .ok_or_else(|| finalize_error(index, "no taproot key signature"))?;
        return Ok((None, Some(Witness::from_items(vec![sig]))));
    }
    if script.is_p2pk() {
        let sig = partial_sig(index, input, script.p2pk_public_key()?)?;
        return Ok((Some(push_script(index, &[sig])?), None));
    }
    if script.is_p2pkh() {
        let (key, sig) = partial_sig_for_hash(index, input, &script.public_key_hash()?)?;
        return Ok((Some(push_script(index, &[sig, key])?), None));
    }
    if script.is_p2wpkh() || script.is_p2wsh() {
        return Ok((None, Some(witness_stack(index, input, script)?)));
    }
    if script.is_p2sh() {
        let redeem = input
            .redeem_script
            .as_ref()
            .ok_or_else(|| finalize_error(index, "no redeem script"))?;
        if hash160(redeem.to_bytes()) != script.script_hash()? {
            return Err(TransactionError::InvalidRedeemScript { index });
        }
        if redeem.is_p2wpkh() || redeem.is_p2wsh() {
            let witness = witness_stack(index, input, redeem)?;
            return Ok((Some(push_script(index, &[redeem.to_bytes()])?), Some(witness)));
        }
        if redeem.is_p2pk() {
            let sig = partial_sig(index, input, redeem.p2pk_public_key()?)?;
            return Ok((Some(push_script(index, &[sig, redeem.to_bytes()])?), None));
        }
        if redeem.is_p2pkh() {
            let (key, sig) = partial_sig_for_hash(index, input, &redeem.public_key_hash()?)?;
            return Ok((Some(push_script(index, &[sig, key, redeem.to_bytes()])?), None));
        }
        return Err(TransactionError::UnsupportedScript(format!(
            "redeem {}",
            describe(redeem)
        )));
    }
    Err(TransactionError::UnsupportedScript(describe(script)))
}

fn witness_stack(index: usize, input: &EnvelopeInput, program: &Script) -> Result<Witness, TransactionError> {
    let (_, program_bytes) = program
        .witness_program()
        .ok_or_else(|| TransactionError::MalformedScript(describe(program)))?;

    if program.is_p2wpkh() {
        let mut hash = [0u8; 20];
        hash.copy_from_slice(program_bytes);
        let (key, sig) = partial_sig_for_hash(index, input, &hash)?;
        return Ok(Witness::from_items(vec![sig.to_vec(), key.to_vec()]));
    }

    let witness_script = input
        .witness_script
        .as_ref()
        .ok_or_else(|| finalize_error(index, "no witness script"))?;
    if sha256(witness_script.to_bytes())[..] != *program_bytes {
        return Err(TransactionError::InvalidWitnessScript { index });
    }
    let ws = witness_script.to_bytes().to_vec();
    if witness_script.is_p2pk() {
        let sig = partial_sig(index, input, witness_script.p2pk_public_key()?)?;
        Ok(Witness::from_items(vec![sig.to_vec(), ws]))
    } else if witness_script.is_p2pkh() {
        let (key, sig) = partial_sig_for_hash(index, input, &witness_script.public_key_hash()?)?;
        Ok(Witness::from_items(vec![sig.to_vec(), key.to_vec(), ws]))
    } else {
        Err(TransactionError::UnsupportedScript(format!(
            "witness {}",
            describe(witness_script)
        )))
    }
}

fn partial_sig<'a>(index: usize, input: &'a EnvelopeInput, key: &[u8]) -> Result<&'a [u8], TransactionError> {
    input
        .partial_sigs
        .get(key)
        .map(Vec::as_slice)
        .ok_or_else(|| finalize_error(index, "no signature for the locking key"))
}

fn partial_sig_for_hash<'a>(
    index: usize,
    input: &'a EnvelopeInput,
    key_hash: &[u8; 20],
) -> Result<(&'a [u8], &'a [u8]), TransactionError> {
    input
        .partial_sigs
        .iter()
        .find(|(key, _)| hash160(key) == *key_hash)
        .map(|(key, sig)| (key.as_slice(), sig.as_slice()))
        .ok_or_else(|| finalize_error(index, "no signature for the locking key hash"))
}

fn push_script(index: usize, parts: &[&[u8]]) -> Result<Script, TransactionError> {
    encode_push_datas(parts)
        .map(Script::from)
        .map_err(|e| finalize_error(index, &e.to_string()))
}

fn finalize_error(index: usize, reason: &str) -> TransactionError {
    TransactionError::FinalizeFailure {
        index,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btctx_primitives::chainhash::Hash;
    use btctx_primitives::ec::PrivateKey;

    use crate::input::TransactionInput;
    use crate::signer::{EcdsaKeySigner, SignerError};

    const KEY: &str = "1790962db820729606cd7b255ace1ac5ebb129ac8e9b2d8534d022194ab25b37";

    fn key() -> PrivateKey {
        PrivateKey::from_hex(KEY).unwrap()
    }

    /// An envelope spending one witness output locked by `locking_script`.
    fn witness_envelope(locking_script: Script) -> Envelope {
        let mut tx = Transaction::new();
        tx.add_input(TransactionInput::from_outpoint(&Hash::new([5; 32]), 0));
        tx.add_output(TransactionOutput::with_script(900, Script::p2wpkh(&[1; 20])));
        let mut envelope = Envelope::from_unsigned_tx(tx).unwrap();
        envelope.inputs[0].witness_utxo = Some(TransactionOutput::with_script(1000, locking_script));
        envelope
    }

    #[test]
    fn test_missing_utxo() {
        let mut tx = Transaction::new();
        tx.add_input(TransactionInput::new());
        tx.add_output(TransactionOutput::with_script(1, Script::p2wpkh(&[1; 20])));
        let mut envelope = Envelope::from_unsigned_tx(tx).unwrap();
        let key = key();
        let err = sign_envelope(&mut envelope, &EcdsaKeySigner::new(key.clone()), &key.pub_key()).unwrap_err();
        assert!(matches!(err, TransactionError::MissingDecoration { index: 0, .. }));
    }

    #[test]
    fn test_legacy_input_needs_prior_transaction() {
        let key = key();
        let mut envelope = witness_envelope(Script::p2pkh(&key.pub_key().hash160()));
        let err = sign_envelope(&mut envelope, &EcdsaKeySigner::new(key.clone()), &key.pub_key()).unwrap_err();
        assert!(matches!(
            err,
            TransactionError::MissingDecoration { index: 0, what: "prior transaction" }
        ));
    }

    #[test]
    fn test_p2wpkh_sign_and_finalize() {
        let key = key();
        let pubkey = key.pub_key();
        let mut envelope = witness_envelope(Script::p2wpkh(&pubkey.hash160()));
        envelope.inputs[0].sighash_type = Some(SIGHASH_ALL);
        sign_envelope(&mut envelope, &EcdsaKeySigner::new(key), &pubkey).unwrap();

        let input = &envelope.inputs[0];
        assert!(input.partial_sigs.is_empty());
        assert!(input.final_script_sig.is_none());
        let witness = input.final_script_witness.as_ref().unwrap();
        assert_eq!(witness.len(), 2);
        assert_eq!(witness.get(1), Some(pubkey.serialize().as_slice()));
        assert_eq!(witness.get(0).unwrap().last(), Some(&(SIGHASH_ALL as u8)));
        assert!(envelope.is_finalized());
    }

    #[test]
    fn test_key_mismatch() {
        let key = key();
        let mut envelope = witness_envelope(Script::p2wpkh(&[0xab; 20]));
        let err = sign_envelope(&mut envelope, &EcdsaKeySigner::new(key.clone()), &key.pub_key()).unwrap_err();
        assert!(matches!(err, TransactionError::KeyMismatch { index: 0 }));
    }

    #[test]
    fn test_unsupported_scripts() {
        let key = key();
        for script in [
            Script::from_hex("6a0474657374").unwrap(),
            Script::from_bytes(&[0x52, 0x52, 0xae]),
        ] {
            let mut envelope = witness_envelope(script);
            let err = sign_envelope(&mut envelope, &EcdsaKeySigner::new(key.clone()), &key.pub_key()).unwrap_err();
            assert!(matches!(err, TransactionError::UnsupportedScript(_)));
        }
    }

    #[test]
    fn test_wrong_redeem_script() {
        let key = key();
        let mut envelope = witness_envelope(Script::p2sh(&[0x11; 20]));
        let err = sign_envelope(&mut envelope, &EcdsaKeySigner::new(key.clone()), &key.pub_key()).unwrap_err();
        assert!(matches!(err, TransactionError::InvalidRedeemScript { index: 0 }));

        let mut envelope = witness_envelope(Script::p2sh(&[0x11; 20]));
        envelope.inputs[0].redeem_script = Some(Script::p2wpkh(&key.pub_key().hash160()));
        let err = sign_envelope(&mut envelope, &EcdsaKeySigner::new(key.clone()), &key.pub_key()).unwrap_err();
        assert!(matches!(err, TransactionError::InvalidRedeemScript { index: 0 }));
    }

    #[test]
    fn test_wrong_witness_script() {
        let key = key();
        let mut envelope = witness_envelope(Script::p2wsh(&[0x22; 32]));
        let err = sign_envelope(&mut envelope, &EcdsaKeySigner::new(key.clone()), &key.pub_key()).unwrap_err();
        assert!(matches!(err, TransactionError::InvalidWitnessScript { index: 0 }));
    }

    #[test]
    fn test_signer_failure_is_reported() {
        let key = key();
        let mut envelope = witness_envelope(Script::p2wpkh(&key.pub_key().hash160()));
        let failing = |_: &[u8; 32]| -> Result<Vec<u8>, SignerError> { Err("hsm offline".into()) };
        let err = sign_envelope(&mut envelope, &failing, &key.pub_key()).unwrap_err();
        match err {
            TransactionError::SignatureFailure { index, reason } => {
                assert_eq!(index, 0);
                assert_eq!(reason, "hsm offline");
            }
            other => panic!("unexpected error: {}", other),
        }

        let garbage = |_: &[u8; 32]| -> Result<Vec<u8>, SignerError> { Ok(vec![0x30, 0x00]) };
        let mut envelope = witness_envelope(Script::p2wpkh(&key.pub_key().hash160()));
        assert!(matches!(
            sign_envelope(&mut envelope, &garbage, &key.pub_key()),
            Err(TransactionError::SignatureFailure { .. })
        ));
    }

    #[test]
    fn test_default_sighash_rejected_for_ecdsa() {
        let key = key();
        let mut envelope = witness_envelope(Script::p2wpkh(&key.pub_key().hash160()));
        envelope.inputs[0].sighash_type = Some(SIGHASH_DEFAULT);
        assert!(matches!(
            sign_envelope(&mut envelope, &EcdsaKeySigner::new(key.clone()), &key.pub_key()),
            Err(TransactionError::SignatureFailure { .. })
        ));
    }

    #[test]
    fn test_finalize_without_signature() {
        let key = key();
        let mut input = EnvelopeInput::default();
        let err = finalize_input(0, &mut input, &Script::p2pkh(&key.pub_key().hash160())).unwrap_err();
        assert!(matches!(err, TransactionError::FinalizeFailure { index: 0, .. }));
        let err = finalize_input(3, &mut input, &Script::p2tr(&[2; 32])).unwrap_err();
        assert!(matches!(err, TransactionError::FinalizeFailure { index: 3, .. }));
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(&Script::from_hex("6a00").unwrap()), "OP_RETURN output");
        assert_eq!(describe(&Script::p2tr(&[0; 32])), "witness v1 program of 32 bytes");
    }
}
