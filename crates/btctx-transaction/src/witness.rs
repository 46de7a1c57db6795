//! Segregated witness stack attached to a transaction input.

use btctx_primitives::util::{ByteReader, ByteWriter, VarInt};

use crate::TransactionError;

/// The witness stack of one input, bottom item first.
///
/// # Wire format (BIP144)
///
/// | Field       | Size                    |
/// |-------------|-------------------------|
/// | item count  | VarInt                  |
/// | items       | VarInt length + bytes   |
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Witness(Vec<Vec<u8>>);

impl Witness {
    pub fn new() -> Self {
        Witness(Vec::new())
    }

    pub fn from_items(items: Vec<Vec<u8>>) -> Self {
        Witness(items)
    }

    /// Append an item to the top of the stack.
    pub fn push(&mut self, item: impl Into<Vec<u8>>) {
        self.0.push(item.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.0.get(index).map(Vec::as_slice)
    }

    /// The top stack item, which is the witness script for P2WSH spends.
    pub fn last(&self) -> Option<&[u8]> {
        self.0.last().map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.0.iter().map(Vec::as_slice)
    }

    pub fn items(&self) -> &[Vec<u8>] {
        &self.0
    }

    /// Deserialize a witness stack from a `ByteReader`.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading witness item count: {}", e))
        })?;
        let mut items = Vec::with_capacity(count.value().min(64) as usize);
        for _ in 0..count.value() {
            let item = reader.read_var_bytes().map_err(|e| {
                TransactionError::SerializationError(format!("reading witness item: {}", e))
            })?;
            items.push(item.to_vec());
        }
        Ok(Witness(items))
    }

    /// Serialize the witness stack into a `ByteWriter`.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_varint(VarInt::from(self.0.len()));
        for item in &self.0 {
            writer.write_var_bytes(item);
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    /// Serialized size in bytes, including the item count.
    pub fn serialized_size(&self) -> usize {
        VarInt::from(self.0.len()).length()
            + self
                .0
                .iter()
                .map(|item| VarInt::from(item.len()).length() + item.len())
                .sum::<usize>()
    }
}

impl From<Vec<Vec<u8>>> for Witness {
    fn from(items: Vec<Vec<u8>>) -> Self {
        Witness(items)
    }
}
