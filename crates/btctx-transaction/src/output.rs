//! Transaction output with satoshi value and locking script.
//!
//! Defines the spending conditions for the output's value. Provides
//! binary serialization/deserialization following the Bitcoin wire format.

use btctx_primitives::util::{ByteReader, ByteWriter, VarInt};
use btctx_script::Script;

use crate::TransactionError;

/// A single output in a transaction.
///
/// Each output specifies a satoshi value and a `locking_script`
/// (scriptPubKey). The `change` flag is a local-only annotation set by the
/// funding loop on the output that returns leftover value to the sender;
/// it is not serialized.
///
/// # Wire format
///
/// | Field            | Size           |
/// |------------------|----------------|
/// | satoshis         | 8 bytes (LE)   |
/// | script length    | VarInt         |
/// | locking_script   | variable       |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutput {
    pub satoshis: u64,

    /// The locking script (scriptPubKey) that defines spending conditions.
    pub locking_script: Script,

    /// Local-only flag marking this output as a change output.
    pub change: bool,
}

impl TransactionOutput {
    /// Create a new `TransactionOutput` with zero satoshis and an empty script.
    pub fn new() -> Self {
        TransactionOutput {
            satoshis: 0,
            locking_script: Script::new(),
            change: false,
        }
    }

    /// Create an output paying `satoshis` to `locking_script`.
    pub fn with_script(satoshis: u64, locking_script: Script) -> Self {
        TransactionOutput {
            satoshis,
            locking_script,
            change: false,
        }
    }

    /// Deserialize a `TransactionOutput` from a `ByteReader`.
    ///
    /// # Returns
    /// `Ok(TransactionOutput)` on success, or a `TransactionError` if the
    /// data is truncated.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let satoshis = reader.read_u64_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading satoshis: {}", e))
        })?;

        let script_bytes = reader.read_var_bytes().map_err(|e| {
            TransactionError::SerializationError(format!("reading locking script: {}", e))
        })?;

        Ok(TransactionOutput {
            satoshis,
            locking_script: Script::from_bytes(script_bytes),
            change: false,
        })
    }

    /// Parse an output from its standalone serialization.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let output = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after output",
                reader.remaining()
            )));
        }
        Ok(output)
    }

    /// Serialize this `TransactionOutput` into a `ByteWriter`.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u64_le(self.satoshis);
        writer.write_var_bytes(self.locking_script.to_bytes());
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    /// Serialized size in bytes.
    pub fn size(&self) -> usize {
        output_size(self.locking_script.len())
    }

    /// Return the locking script as a hex-encoded string.
    pub fn locking_script_hex(&self) -> String {
        self.locking_script.to_hex()
    }
}

impl Default for TransactionOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialized size of an output whose locking script is `script_len` bytes.
pub fn output_size(script_len: usize) -> usize {
    8 + VarInt::from(script_len).length() + script_len
}
