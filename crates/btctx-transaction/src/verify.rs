//! Signature verification without a script interpreter.
//!
//! Recomputes each input's digest from its spent output and checks the
//! signature found in the scriptSig or witness against a known key. Only
//! the single-key layouts the signer produces are understood; other inputs
//! are skipped with a warning.

use btctx_primitives::ec::{PublicKey, Signature};
use btctx_primitives::hash::{hash160, sha256};
use btctx_primitives::schnorr::{tweak_public_key, XOnlyPublicKey};
use btctx_script::Script;
use tracing::{debug, warn};

use crate::envelope::Envelope;
use crate::output::TransactionOutput;
use crate::sighash::{
    legacy_signature_hash, segwit_v0_signature_hash, taproot_key_spend_signature_hash, SighashCache,
    SIGHASH_DEFAULT,
};
use crate::sign::{describe, spent_outputs};
use crate::transaction::Transaction;
use crate::TransactionError;

/// Verify every finalized input of `envelope` against `pubkey`.
pub fn verify_envelope(envelope: &Envelope, pubkey: &PublicKey) -> Result<(), TransactionError> {
    let prevouts = spent_outputs(&envelope.unsigned_tx, &envelope.inputs)?;
    let tx = envelope.extract()?;
    verify_tx(&tx, &prevouts, pubkey)
}

/// Verify every input of a signed transaction against `pubkey`.
///
/// # Arguments
/// * `tx`       - The signed transaction.
/// * `prevouts` - The output spent by each input, in input order.
/// * `pubkey`   - The untweaked key expected to have signed every input.
///
/// # Returns
/// `Ok(())`, or `VerificationFailed` naming the first bad input.
pub fn verify_tx(
    tx: &Transaction,
    prevouts: &[TransactionOutput],
    pubkey: &PublicKey,
) -> Result<(), TransactionError> {
    let cache = SighashCache::with_prevouts(tx, prevouts)?;
    let verifier = Verifier {
        tx,
        cache,
        prevouts,
        pubkey,
    };
    for index in 0..tx.inputs.len() {
        verifier.verify_input(index)?;
    }
    Ok(())
}

struct Verifier<'a> {
    tx: &'a Transaction,
    cache: SighashCache,
    prevouts: &'a [TransactionOutput],
    pubkey: &'a PublicKey,
}

impl Verifier<'_> {
    fn verify_input(&self, index: usize) -> Result<(), TransactionError> {
        let script = &self.prevouts[index].locking_script;
        let input = &self.tx.inputs[index];
        let pushed = match &input.unlocking_script {
            Some(script_sig) => pushes(index, script_sig)?,
            None => Vec::new(),
        };
        let pushes: Vec<&[u8]> = pushed.iter().map(Vec::as_slice).collect();
        let witness: Vec<&[u8]> = input.witness.iter().collect();

        if script.is_p2tr() {
            self.verify_taproot(index, script, &witness)
        } else if script.is_p2pk() {
            let [sig] = expect_items::<1>(index, &pushes, "scriptSig")?;
            self.check_key(index, script.p2pk_public_key()?)?;
            self.verify_legacy(index, script, sig)
        } else if script.is_p2pkh() {
            let [sig, key] = expect_items::<2>(index, &pushes, "scriptSig")?;
            self.check_key(index, key)?;
            if hash160(key) != script.public_key_hash()? {
                return Err(fail(index, "public key does not hash to the locking script"));
            }
            self.verify_legacy(index, script, sig)
        } else if script.is_p2wpkh() || script.is_p2wsh() {
            if !pushes.is_empty() {
                return Err(fail(index, "native witness spend carries a scriptSig"));
            }
            self.verify_witness_v0(index, script, &witness)
        } else if script.is_p2sh() {
            let (redeem, rest) = pushes
                .split_last()
                .ok_or_else(|| fail(index, "empty scriptSig for a P2SH output"))?;
            let redeem = Script::from_bytes(redeem);
            if hash160(redeem.to_bytes()) != script.script_hash()? {
                return Err(fail(index, "redeem script does not match the P2SH hash"));
            }
            if redeem.is_p2wpkh() || redeem.is_p2wsh() {
                if !rest.is_empty() {
                    return Err(fail(index, "nested witness spend pushes more than the redeem script"));
                }
                self.verify_witness_v0(index, &redeem, &witness)
            } else if redeem.is_p2pk() {
                let [sig] = expect_items::<1>(index, rest, "scriptSig")?;
                self.check_key(index, redeem.p2pk_public_key()?)?;
                self.verify_legacy(index, &redeem, sig)
            } else if redeem.is_p2pkh() {
                let [sig, key] = expect_items::<2>(index, rest, "scriptSig")?;
                self.check_key(index, key)?;
                self.verify_legacy(index, &redeem, sig)
            } else {
                warn!(index, redeem = %describe(&redeem), "skipping unsupported redeem script");
                Ok(())
            }
        } else {
            warn!(index, script = %describe(script), "skipping unsupported input");
            Ok(())
        }
    }

    fn verify_legacy(&self, index: usize, subscript: &Script, sig: &[u8]) -> Result<(), TransactionError> {
        let (der, sighash_type) = split_ecdsa(index, sig)?;
        let digest = legacy_signature_hash(self.tx, index, subscript, sighash_type)?;
        self.check_ecdsa(index, der, &digest)
    }

    fn verify_witness_v0(&self, index: usize, program: &Script, witness: &[&[u8]]) -> Result<(), TransactionError> {
        let amount = self.prevouts[index].satoshis;
        if program.is_p2wpkh() {
            let [sig, key] = expect_items::<2>(index, witness, "witness")?;
            self.check_key(index, key)?;
            if program.witness_program().map(|(_, p)| p) != Some(&hash160(key)[..]) {
                return Err(fail(index, "public key does not hash to the witness program"));
            }
            let (der, sighash_type) = split_ecdsa(index, sig)?;
            let digest = segwit_v0_signature_hash(self.tx, &self.cache, index, program, amount, sighash_type)?;
            return self.check_ecdsa(index, der, &digest);
        }

        let (witness_script, items) = witness
            .split_last()
            .ok_or_else(|| fail(index, "empty witness for a P2WSH output"))?;
        if program.witness_program().map(|(_, p)| p) != Some(&sha256(witness_script)[..]) {
            return Err(TransactionError::InvalidWitnessScript { index });
        }
        let witness_script = Script::from_bytes(witness_script);
        let sig = if witness_script.is_p2pk() {
            let [sig] = expect_items::<1>(index, items, "witness")?;
            self.check_key(index, witness_script.p2pk_public_key()?)?;
            sig
        } else if witness_script.is_p2pkh() {
            let [sig, key] = expect_items::<2>(index, items, "witness")?;
            self.check_key(index, key)?;
            sig
        } else {
            warn!(index, witness_script = %describe(&witness_script), "skipping unsupported witness script");
            return Ok(());
        };
        let (der, sighash_type) = split_ecdsa(index, sig)?;
        let digest = segwit_v0_signature_hash(self.tx, &self.cache, index, &witness_script, amount, sighash_type)?;
        self.check_ecdsa(index, der, &digest)
    }

    fn verify_taproot(&self, index: usize, script: &Script, witness: &[&[u8]]) -> Result<(), TransactionError> {
        let [sig] = expect_items::<1>(index, witness, "witness")?;
        let (sig, sighash_type) = match sig.len() {
            64 => (sig, SIGHASH_DEFAULT),
            65 if sig[64] != 0x00 => (&sig[..64], sig[64] as u32),
            65 => return Err(fail(index, "explicit SIGHASH_DEFAULT byte in a taproot signature")),
            n => return Err(fail(index, &format!("taproot signature of {} bytes", n))),
        };
        let (output_key, _) = tweak_public_key(&XOnlyPublicKey::from(self.pubkey), None)?;
        if script.witness_program().map(|(_, p)| p) != Some(&output_key.as_bytes()[..]) {
            return Err(fail(index, "output key does not belong to the expected key"));
        }
        let digest = taproot_key_spend_signature_hash(self.tx, &self.cache, index, self.prevouts, sighash_type)?;
        if !output_key.verify(&digest, sig) {
            return Err(fail(index, "schnorr signature does not verify"));
        }
        debug!(index, "verified taproot input");
        Ok(())
    }

    fn check_key(&self, index: usize, key: &[u8]) -> Result<(), TransactionError> {
        if key != self.pubkey.serialize().as_slice() {
            return Err(fail(index, "signature key is not the expected key"));
        }
        Ok(())
    }

    fn check_ecdsa(&self, index: usize, der: &[u8], digest: &[u8; 32]) -> Result<(), TransactionError> {
        let sig = Signature::from_der(der).map_err(|e| fail(index, &format!("bad DER signature: {}", e)))?;
        if !sig.verify(digest, self.pubkey) {
            return Err(fail(index, "ECDSA signature does not verify"));
        }
        debug!(index, "verified ECDSA input");
        Ok(())
    }
}

/// The pushed items of a push-only script. `OP_0` pushes an empty item.
fn pushes(index: usize, script: &Script) -> Result<Vec<Vec<u8>>, TransactionError> {
    script
        .chunks()?
        .into_iter()
        .map(|chunk| {
            if !chunk.is_push() {
                return Err(fail(index, "scriptSig is not push-only"));
            }
            Ok(chunk.data.unwrap_or_default())
        })
        .collect()
}

fn expect_items<'a, const N: usize>(
    index: usize,
    items: &[&'a [u8]],
    place: &str,
) -> Result<[&'a [u8]; N], TransactionError> {
    <[&[u8]; N]>::try_from(items).map_err(|_| {
        fail(
            index,
            &format!("expected {} {} items, found {}", N, place, items.len()),
        )
    })
}

fn split_ecdsa(index: usize, sig: &[u8]) -> Result<(&[u8], u32), TransactionError> {
    match sig.split_last() {
        Some((&sighash_type, der)) if sighash_type != 0 => Ok((der, sighash_type as u32)),
        _ => Err(fail(index, "ECDSA signature without a valid hash type byte")),
    }
}

fn fail(index: usize, reason: &str) -> TransactionError {
    TransactionError::VerificationFailed {
        index,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btctx_primitives::ec::PrivateKey;

    use crate::input::TransactionInput;
    use crate::witness::Witness;

    #[test]
    fn test_pushes_include_empty_op_0() {
        let script = Script::from_hex("00024142").unwrap();
        let items = pushes(0, &script).unwrap();
        assert_eq!(items, vec![vec![], vec![0x41, 0x42]]);
        assert!(pushes(0, &Script::from_hex("0141ac").unwrap()).is_err());
    }

    #[test]
    fn test_pushes_with_pushdata1() {
        let mut bytes = vec![0x4c, 80];
        bytes.extend_from_slice(&[7; 80]);
        bytes.push(0x01);
        bytes.push(0x09);
        let script = Script::from_bytes(&bytes);
        let items = pushes(0, &script).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], vec![7u8; 80]);
        assert_eq!(items[1], vec![9u8]);
    }

    #[test]
    fn test_split_ecdsa() {
        assert_eq!(split_ecdsa(0, &[0x30, 0x01]).unwrap(), (&[0x30][..], 1));
        assert!(split_ecdsa(0, &[0x30, 0x00]).is_err());
        assert!(split_ecdsa(0, &[]).is_err());
    }

    #[test]
    fn test_unsupported_input_is_skipped() {
        let key = PrivateKey::from_hex("1790962db820729606cd7b255ace1ac5ebb129ac8e9b2d8534d022194ab25b37").unwrap();
        let mut tx = Transaction::new();
        tx.add_input(TransactionInput::new());
        tx.add_output(TransactionOutput::with_script(1, Script::p2wpkh(&[0; 20])));
        let prevouts = vec![TransactionOutput::with_script(5, Script::from_bytes(&[0x52, 0x52, 0xae]))];
        assert!(verify_tx(&tx, &prevouts, &key.pub_key()).is_ok());
    }

    #[test]
    fn test_bad_taproot_witness() {
        let key = PrivateKey::from_hex("1790962db820729606cd7b255ace1ac5ebb129ac8e9b2d8534d022194ab25b37").unwrap();
        let pubkey = key.pub_key();
        let (output_key, _) = tweak_public_key(&XOnlyPublicKey::from(&pubkey), None).unwrap();
        let mut tx = Transaction::new();
        let mut input = TransactionInput::new();
        input.witness = Witness::from_items(vec![vec![1; 64]]);
        tx.add_input(input);
        tx.add_output(TransactionOutput::with_script(1, Script::p2wpkh(&[0; 20])));
        let prevouts = vec![TransactionOutput::with_script(5, Script::p2tr(output_key.as_bytes()))];
        assert!(matches!(
            verify_tx(&tx, &prevouts, &pubkey),
            Err(TransactionError::VerificationFailed { index: 0, .. })
        ));

        tx.inputs[0].witness = Witness::from_items(vec![{
            let mut sig = vec![1; 64];
            sig.push(0x00);
            sig
        }]);
        assert!(verify_tx(&tx, &prevouts, &pubkey).is_err());
    }
}
