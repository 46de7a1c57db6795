//! Signature hash computation for transaction signing.
//!
//! Three digest families are implemented:
//! - [`legacy`]: the original algorithm used by P2PK, P2PKH and bare P2SH spends.
//! - [`segwit`]: BIP143, used by segwit v0 programs (P2WPKH, P2WSH and their
//!   P2SH-nested forms). Commits to the amount being spent.
//! - [`taproot`]: BIP341 key-path spends. Commits to every spent output.
//!
//! The per-transaction hashes shared by BIP143 and BIP341 are computed once
//! in a [`SighashCache`], so signing `n` inputs costs `O(n)` rather than `O(n^2)`.

pub mod legacy;
pub mod segwit;
pub mod taproot;

pub use legacy::legacy_signature_hash;
pub use segwit::{p2wpkh_script_code, segwit_v0_signature_hash};
pub use taproot::taproot_key_spend_signature_hash;

use btctx_primitives::hash::sha256;
use btctx_primitives::util::ByteWriter;

use crate::output::TransactionOutput;
use crate::transaction::Transaction;
use crate::TransactionError;

// -----------------------------------------------------------------------
// Sighash flag constants
// -----------------------------------------------------------------------

/// Taproot only: sign everything, encoded as a 64-byte signature with no
/// trailing hash-type byte.
pub const SIGHASH_DEFAULT: u32 = 0x00;

/// Sign all inputs and all outputs.
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign all inputs but no outputs, allowing outputs to be modified.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and only the output with the same index as the signed input.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Combined with another flag: only sign the current input, allowing other
/// inputs to be added later.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Mask applied to extract the base sighash type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

// -----------------------------------------------------------------------
// Shared per-transaction hashes
// -----------------------------------------------------------------------

/// Single-SHA256 midstate hashes over a transaction's inputs and outputs.
///
/// BIP341 uses these directly. BIP143 uses their double-SHA256 form, which
/// is one more SHA256 over the stored value.
#[derive(Clone, Debug)]
pub struct SighashCache {
    sha_prevouts: [u8; 32],
    sha_sequences: [u8; 32],
    sha_outputs: [u8; 32],
    taproot: Option<TaprootHashes>,
}

#[derive(Clone, Debug)]
struct TaprootHashes {
    sha_amounts: [u8; 32],
    sha_script_pubkeys: [u8; 32],
}

impl SighashCache {
    /// Compute the hashes that depend only on `tx`.
    pub fn new(tx: &Transaction) -> Self {
        let mut prevouts = ByteWriter::with_capacity(tx.inputs.len() * 36);
        let mut sequences = ByteWriter::with_capacity(tx.inputs.len() * 4);
        for input in &tx.inputs {
            input.write_outpoint(&mut prevouts);
            sequences.write_u32_le(input.sequence_number);
        }

        let mut outputs = ByteWriter::new();
        for output in &tx.outputs {
            output.write_to(&mut outputs);
        }

        SighashCache {
            sha_prevouts: sha256(prevouts.as_bytes()),
            sha_sequences: sha256(sequences.as_bytes()),
            sha_outputs: sha256(outputs.as_bytes()),
            taproot: None,
        }
    }

    /// Compute every hash, including the taproot ones over `prevouts`.
    ///
    /// # Arguments
    /// * `tx` - The transaction being signed.
    /// * `prevouts` - The outputs spent by each input, in input order.
    ///
    /// # Returns
    /// The cache, or `InvalidTransaction` if `prevouts` does not have one
    /// entry per input.
    pub fn with_prevouts(
        tx: &Transaction,
        prevouts: &[TransactionOutput],
    ) -> Result<Self, TransactionError> {
        if prevouts.len() != tx.inputs.len() {
            return Err(TransactionError::InvalidTransaction(format!(
                "{} prevouts for {} inputs",
                prevouts.len(),
                tx.inputs.len()
            )));
        }
        let mut cache = Self::new(tx);

        let mut amounts = ByteWriter::with_capacity(prevouts.len() * 8);
        let mut scripts = ByteWriter::new();
        for prevout in prevouts {
            amounts.write_u64_le(prevout.satoshis);
            scripts.write_var_bytes(prevout.locking_script.to_bytes());
        }
        cache.taproot = Some(TaprootHashes {
            sha_amounts: sha256(amounts.as_bytes()),
            sha_script_pubkeys: sha256(scripts.as_bytes()),
        });
        Ok(cache)
    }

    /// Whether the taproot hashes are available.
    pub fn has_prevouts(&self) -> bool {
        self.taproot.is_some()
    }

    pub(crate) fn hash_prevouts_v0(&self) -> [u8; 32] {
        sha256(&self.sha_prevouts)
    }

    pub(crate) fn hash_sequence_v0(&self) -> [u8; 32] {
        sha256(&self.sha_sequences)
    }

    pub(crate) fn hash_outputs_v0(&self) -> [u8; 32] {
        sha256(&self.sha_outputs)
    }
}

/// Check that `input_index` addresses an input of `tx`.
pub(crate) fn check_input_index(tx: &Transaction, input_index: usize) -> Result<(), TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        )));
    }
    Ok(())
}
