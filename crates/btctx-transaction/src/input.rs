//! Transaction input referencing a previous output.
//!
//! Contains the source transaction ID, output index, unlocking script,
//! sequence number and witness stack. Signing metadata about the output
//! being spent lives in the envelope, not here.

use btctx_primitives::chainhash::Hash;
use btctx_primitives::util::{ByteReader, ByteWriter, VarInt};
use btctx_script::Script;

use crate::witness::Witness;
use crate::TransactionError;

/// Default sequence number indicating a finalized input (no relative lock-time).
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// A single input in a transaction.
///
/// Each input references an output from a previous transaction by its
/// transaction ID (`source_txid`) and output index (`source_tx_out_index`).
/// The `unlocking_script` (scriptSig) and `witness` supply the data required
/// to satisfy the referenced output's locking script.
///
/// # Wire format (base)
///
/// | Field              | Size             |
/// |--------------------|------------------|
/// | source_txid        | 32 bytes (LE)    |
/// | source_tx_out_index| 4 bytes (LE)     |
/// | script length      | VarInt           |
/// | unlocking_script   | variable         |
/// | sequence_number    | 4 bytes (LE)     |
///
/// The witness is written separately, after all outputs (BIP144).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    /// The 32-byte transaction ID of the output being spent, in internal
    /// (little-endian) byte order.
    pub source_txid: [u8; 32],

    /// Index of the output within the source transaction.
    pub source_tx_out_index: u32,

    /// Sequence number. Defaults to `0xFFFFFFFF` (finalized).
    pub sequence_number: u32,

    /// The unlocking script (scriptSig). `None` when empty.
    pub unlocking_script: Option<Script>,

    /// Witness stack. Empty for legacy spends and unsigned inputs.
    pub witness: Witness,
}

impl TransactionInput {
    /// Create a new `TransactionInput` with a zeroed outpoint and a
    /// finalized sequence number.
    pub fn new() -> Self {
        TransactionInput {
            source_txid: [0u8; 32],
            source_tx_out_index: 0,
            sequence_number: DEFAULT_SEQUENCE_NUMBER,
            unlocking_script: None,
            witness: Witness::new(),
        }
    }

    /// Create an unsigned input spending `txid:vout`.
    pub fn from_outpoint(txid: &Hash, vout: u32) -> Self {
        TransactionInput {
            source_txid: *txid.as_bytes(),
            source_tx_out_index: vout,
            ..Self::new()
        }
    }

    /// The txid of the output being spent.
    pub fn source_txid_hash(&self) -> Hash {
        Hash::new(self.source_txid)
    }

    /// Deserialize the base (non-witness) part of an input.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of an encoded input.
    ///
    /// # Returns
    /// `Ok(TransactionInput)` with an empty witness, or a `TransactionError`
    /// if the data is truncated.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let source_txid = reader.read_array::<32>().map_err(|e| {
            TransactionError::SerializationError(format!("reading source txid: {}", e))
        })?;

        let source_tx_out_index = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output index: {}", e))
        })?;

        let script_bytes = reader.read_var_bytes().map_err(|e| {
            TransactionError::SerializationError(format!("reading unlocking script: {}", e))
        })?;

        let sequence_number = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence number: {}", e))
        })?;

        let unlocking_script = if script_bytes.is_empty() {
            None
        } else {
            Some(Script::from_bytes(script_bytes))
        };

        Ok(TransactionInput {
            source_txid,
            source_tx_out_index,
            sequence_number,
            unlocking_script,
            witness: Witness::new(),
        })
    }

    /// Serialize the base (non-witness) part of this input.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        self.write_outpoint(writer);
        match &self.unlocking_script {
            Some(script) => writer.write_var_bytes(script.to_bytes()),
            None => writer.write_varint(VarInt::from(0u64)),
        }
        writer.write_u32_le(self.sequence_number);
    }

    /// Write the 36-byte outpoint (txid + output index).
    pub fn write_outpoint(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.source_txid);
        writer.write_u32_le(self.source_tx_out_index);
    }

    /// Size of the base serialization in bytes.
    pub fn base_size(&self) -> usize {
        let script_len = self.unlocking_script.as_ref().map_or(0, Script::len);
        36 + VarInt::from(script_len).length() + script_len + 4
    }

    /// Whether the input carries a scriptSig or witness.
    pub fn is_signed(&self) -> bool {
        self.unlocking_script.as_ref().is_some_and(|s| !s.is_empty()) || !self.witness.is_empty()
    }
}

impl Default for TransactionInput {
    fn default() -> Self {
        Self::new()
    }
}
