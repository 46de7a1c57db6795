//! Core transaction type.
//!
//! Represents a complete transaction with version, inputs, outputs, and
//! locktime. Supports the legacy and BIP144 (segwit) wire forms, txid and
//! wtxid computation, and the weight / virtual-size metrics used for fees.

use std::fmt;

use btctx_primitives::chainhash::Hash;
use btctx_primitives::hash::sha256d;
use btctx_primitives::util::{ByteReader, ByteWriter, VarInt};

use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::TransactionError;

/// Version used for newly built transactions.
pub const TX_VERSION: u32 = 1;

/// Weight units per virtual byte.
pub const WITNESS_SCALE_FACTOR: usize = 4;

const SEGWIT_MARKER: u8 = 0x00;
const SEGWIT_FLAG: u8 = 0x01;

/// A transaction consisting of a version, a set of inputs, a set of
/// outputs, and a lock time.
///
/// # Wire format
///
/// | Field        | Size                          |
/// |--------------|-------------------------------|
/// | version      | 4 bytes (LE)                  |
/// | marker, flag | 2 bytes, only with witnesses  |
/// | input count  | VarInt                        |
/// | inputs       | variable (per input)          |
/// | output count | VarInt                        |
/// | outputs      | variable (per output)         |
/// | witnesses    | one stack per input, if any   |
/// | lock_time    | 4 bytes (LE)                  |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction format version. Currently 1 or 2.
    pub version: u32,

    /// Ordered list of transaction inputs.
    pub inputs: Vec<TransactionInput>,

    /// Ordered list of transaction outputs.
    pub outputs: Vec<TransactionOutput>,

    /// Lock time. If non-zero, the transaction is not valid until the
    /// specified block height or Unix timestamp.
    pub lock_time: u32,
}

impl Transaction {
    /// Create a new empty transaction with version 1 and lock time 0.
    pub fn new() -> Self {
        Transaction {
            version: TX_VERSION,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse a transaction from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string of the raw transaction bytes.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` if the hex is
    /// invalid or the bytes do not form a valid transaction.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str).map_err(|e| {
            TransactionError::SerializationError(format!("invalid hex: {}", e))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parse a transaction from raw bytes.
    ///
    /// This method requires the byte slice to contain exactly one complete
    /// transaction with no trailing data.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` if the data
    /// is truncated, malformed, or has trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a transaction from a `ByteReader`.
    ///
    /// Accepts both the legacy form and the BIP144 form. A zero input count
    /// followed by the `0x01` flag byte selects the segwit form.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of a serialized transaction.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` on format errors.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading version: {}", e))
        })?;

        let mut input_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading input count: {}", e))
        })?;

        let mut segwit = false;
        if input_count.value() == SEGWIT_MARKER as u64 && reader.peek_u8().ok() == Some(SEGWIT_FLAG) {
            reader.read_u8().map_err(|e| {
                TransactionError::SerializationError(format!("reading segwit flag: {}", e))
            })?;
            segwit = true;
            input_count = reader.read_varint().map_err(|e| {
                TransactionError::SerializationError(format!("reading input count: {}", e))
            })?;
        }

        let mut inputs = Vec::with_capacity(input_count.value().min(1024) as usize);
        for _ in 0..input_count.value() {
            inputs.push(TransactionInput::read_from(reader)?);
        }

        let output_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading output count: {}", e))
        })?;

        let mut outputs = Vec::with_capacity(output_count.value().min(1024) as usize);
        for _ in 0..output_count.value() {
            outputs.push(TransactionOutput::read_from(reader)?);
        }

        if segwit {
            for input in inputs.iter_mut() {
                input.witness = crate::witness::Witness::read_from(reader)?;
            }
            if inputs.iter().all(|i| i.witness.is_empty()) {
                return Err(TransactionError::SerializationError(
                    "segwit flag set but no witness data".to_string(),
                ));
            }
        }

        let lock_time = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading lock time: {}", e))
        })?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Serialize this transaction to raw bytes, including witness data
    /// when any input carries some.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.serialize(self.has_witness())
    }

    /// Serialize without witness data (the form hashed for the txid).
    pub fn to_bytes_no_witness(&self) -> Vec<u8> {
        self.serialize(false)
    }

    fn serialize(&self, with_witness: bool) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(256);
        writer.write_u32_le(self.version);
        if with_witness {
            writer.write_u8(SEGWIT_MARKER);
            writer.write_u8(SEGWIT_FLAG);
        }

        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(&mut writer);
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut writer);
        }

        if with_witness {
            for input in &self.inputs {
                input.witness.write_to(&mut writer);
            }
        }

        writer.write_u32_le(self.lock_time);
        writer.into_bytes()
    }

    /// Serialize this transaction to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Whether any input has a non-empty witness stack.
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|i| !i.witness.is_empty())
    }

    // -----------------------------------------------------------------
    // Transaction ID
    // -----------------------------------------------------------------

    /// Compute the transaction ID (double SHA-256 of the witness-stripped
    /// serialization), in internal byte order.
    pub fn tx_id(&self) -> [u8; 32] {
        sha256d(&self.to_bytes_no_witness())
    }

    /// The transaction ID as a [`Hash`].
    pub fn tx_hash(&self) -> Hash {
        Hash::new(self.tx_id())
    }

    /// Compute the transaction ID as a display-order hex string.
    pub fn tx_id_hex(&self) -> String {
        self.tx_hash().to_string()
    }

    /// Compute the witness transaction ID (double SHA-256 of the full
    /// serialization). Equals the txid when there is no witness data.
    pub fn wtx_id(&self) -> [u8; 32] {
        sha256d(&self.to_bytes())
    }

    // -----------------------------------------------------------------
    // Size metrics
    // -----------------------------------------------------------------

    /// Size of the witness-stripped serialization in bytes.
    pub fn base_size(&self) -> usize {
        8 + VarInt::from(self.inputs.len()).length()
            + self.inputs.iter().map(TransactionInput::base_size).sum::<usize>()
            + VarInt::from(self.outputs.len()).length()
            + self.outputs.iter().map(TransactionOutput::size).sum::<usize>()
    }

    /// Size of the full serialization in bytes.
    pub fn total_size(&self) -> usize {
        if !self.has_witness() {
            return self.base_size();
        }
        self.base_size()
            + 2
            + self
                .inputs
                .iter()
                .map(|i| i.witness.serialized_size())
                .sum::<usize>()
    }

    /// Return the size of this transaction in bytes.
    pub fn size(&self) -> usize {
        self.total_size()
    }

    /// Transaction weight: `base_size * 3 + total_size`.
    pub fn weight(&self) -> usize {
        self.base_size() * (WITNESS_SCALE_FACTOR - 1) + self.total_size()
    }

    /// Virtual size: weight divided by four, rounded up.
    pub fn vsize(&self) -> usize {
        self.weight().div_ceil(WITNESS_SCALE_FACTOR)
    }

    // -----------------------------------------------------------------
    // Inputs and outputs
    // -----------------------------------------------------------------

    /// Append a `TransactionInput` to this transaction.
    pub fn add_input(&mut self, input: TransactionInput) {
        self.inputs.push(input);
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Append a `TransactionOutput` to this transaction.
    pub fn add_output(&mut self, output: TransactionOutput) {
        self.outputs.push(output);
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Compute the sum of all output satoshi values.
    pub fn total_output_satoshis(&self) -> u64 {
        self.outputs.iter().map(|o| o.satoshis).sum()
    }

    /// Determine whether this transaction is a coinbase transaction.
    ///
    /// A coinbase transaction has exactly one input with an all-zero txid
    /// and either `source_tx_out_index == 0xFFFFFFFF` or
    /// `sequence_number == 0xFFFFFFFF`.
    pub fn is_coinbase(&self) -> bool {
        if self.inputs.len() != 1 {
            return false;
        }

        let input = &self.inputs[0];
        if input.source_txid != [0u8; 32] {
            return false;
        }

        input.source_tx_out_index == 0xFFFF_FFFF || input.sequence_number == 0xFFFF_FFFF
    }

    /// A copy of this transaction with every scriptSig and witness cleared.
    pub fn unsigned_copy(&self) -> Transaction {
        let mut tx = self.clone();
        for input in tx.inputs.iter_mut() {
            input.unlocking_script = None;
            input.witness = crate::witness::Witness::new();
        }
        tx
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
