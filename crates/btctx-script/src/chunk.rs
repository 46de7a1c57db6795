//! Script chunk parsing and push-data encoding.
//!
//! A chunk is either a bare opcode or a data push together with its bytes.

use crate::opcodes::*;
use crate::ScriptError;

/// A single parsed element of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes this is the data length.
    pub op: u8,
    /// The pushed bytes, if this chunk is a push operation.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// Render the chunk as an ASM token: pushed data as hex, opcodes by name.
    pub fn to_asm_string(&self) -> String {
        match &self.data {
            Some(data) if self.op > OP_0 && self.op <= OP_PUSHDATA4 => hex::encode(data),
            _ => opcode_to_string(self.op),
        }
    }

    /// Whether the chunk pushes data (including the empty push `OP_0`).
    pub fn is_push(&self) -> bool {
        self.op <= OP_PUSHDATA4
    }
}

/// Decode raw script bytes into chunks.
///
/// # Arguments
/// * `bytes` - The raw script bytes.
///
/// # Returns
/// The parsed chunks, or `DataTooSmall` if a push runs past the end.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let op = bytes[pos];
        let (header, length) = match op {
            OP_DATA_1..=OP_DATA_75 => (1, op as usize),
            OP_PUSHDATA1 => (2, read_len(bytes, pos + 1, 1)?),
            OP_PUSHDATA2 => (3, read_len(bytes, pos + 1, 2)?),
            OP_PUSHDATA4 => (5, read_len(bytes, pos + 1, 4)?),
            _ => {
                chunks.push(ScriptChunk { op, data: None });
                pos += 1;
                continue;
            }
        };
        let start = pos + header;
        let end = start.checked_add(length).ok_or(ScriptError::DataTooSmall)?;
        if end > bytes.len() {
            return Err(ScriptError::DataTooSmall);
        }
        chunks.push(ScriptChunk {
            op,
            data: Some(bytes[start..end].to_vec()),
        });
        pos = end;
    }

    Ok(chunks)
}

/// Read a little-endian push length of `width` bytes starting at `at`.
fn read_len(bytes: &[u8], at: usize, width: usize) -> Result<usize, ScriptError> {
    let field = bytes.get(at..at + width).ok_or(ScriptError::DataTooSmall)?;
    Ok(field
        .iter()
        .rev()
        .fold(0usize, |acc, b| (acc << 8) | *b as usize))
}

/// Compute the minimal push prefix for a payload of `data_len` bytes.
///
/// # Returns
/// The prefix bytes, or `DataTooBig` if the length does not fit `OP_PUSHDATA4`.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= OP_DATA_75 as usize {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xFF {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xFFFF {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xFFFF_FFFF {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::DataTooBig)
    }
}

/// Concatenate several payloads, each with its own push prefix.
///
/// Used to assemble scriptSigs out of signature and key pushes.
pub fn encode_push_datas(parts: &[&[u8]]) -> Result<Vec<u8>, ScriptError> {
    let mut result = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        let prefix = push_data_prefix(part.len()).map_err(|_| ScriptError::PartTooBig(i))?;
        result.extend_from_slice(&prefix);
        result.extend_from_slice(part);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_p2pkh() {
        let bytes = hex::decode("76a914e2a623699e81b291c0327f408fea765d534baa2a88ac").unwrap();
        let chunks = decode_script(&bytes).unwrap();
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[0].op, OP_DUP);
        assert_eq!(chunks[2].op, OP_DATA_20);
        assert_eq!(
            hex::encode(chunks[2].data.as_ref().unwrap()),
            "e2a623699e81b291c0327f408fea765d534baa2a"
        );
        assert_eq!(chunks[4].op, OP_CHECKSIG);
    }

    #[test]
    fn test_decode_pushdata_forms() {
        let mut bytes = vec![OP_PUSHDATA1, 3, 1, 2, 3];
        bytes.extend_from_slice(&[OP_PUSHDATA2, 2, 0, 9, 9]);
        bytes.extend_from_slice(&[OP_PUSHDATA4, 1, 0, 0, 0, 7]);
        let chunks = decode_script(&bytes).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].data.as_deref(), Some(&[1u8, 2, 3][..]));
        assert_eq!(chunks[1].data.as_deref(), Some(&[9u8, 9][..]));
        assert_eq!(chunks[2].data.as_deref(), Some(&[7u8][..]));
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(decode_script(&[0x05, 1, 2]), Err(ScriptError::DataTooSmall)));
        assert!(matches!(decode_script(&[OP_PUSHDATA1]), Err(ScriptError::DataTooSmall)));
        assert!(matches!(
            decode_script(&[OP_PUSHDATA2, 0xff]),
            Err(ScriptError::DataTooSmall)
        ));
        assert!(matches!(
            decode_script(&[OP_PUSHDATA4, 0xff, 0xff, 0xff, 0xff]),
            Err(ScriptError::DataTooSmall)
        ));
    }

    #[test]
    fn test_push_data_prefix_boundaries() {
        assert_eq!(push_data_prefix(0).unwrap(), vec![0x00]);
        assert_eq!(push_data_prefix(75).unwrap(), vec![75]);
        assert_eq!(push_data_prefix(76).unwrap(), vec![OP_PUSHDATA1, 76]);
        assert_eq!(push_data_prefix(255).unwrap(), vec![OP_PUSHDATA1, 255]);
        assert_eq!(push_data_prefix(256).unwrap(), vec![OP_PUSHDATA2, 0x00, 0x01]);
        assert_eq!(
            push_data_prefix(0x10000).unwrap(),
            vec![OP_PUSHDATA4, 0x00, 0x00, 0x01, 0x00]
        );
    }

    #[test]
    fn test_encode_push_datas_decodes_back() {
        let sig = vec![0x30u8; 72];
        let key = vec![0x02u8; 33];
        let encoded = encode_push_datas(&[&sig, &key]).unwrap();
        assert_eq!(encoded.len(), 1 + 72 + 1 + 33);
        let chunks = decode_script(&encoded).unwrap();
        assert_eq!(chunks[0].data.as_ref().unwrap(), &sig);
        assert_eq!(chunks[1].data.as_ref().unwrap(), &key);
    }

    #[test]
    fn test_asm_string() {
        let push = ScriptChunk { op: 2, data: Some(vec![0xab, 0xcd]) };
        assert_eq!(push.to_asm_string(), "abcd");
        assert!(push.is_push());
        let op = ScriptChunk { op: OP_EQUAL, data: None };
        assert_eq!(op.to_asm_string(), "OP_EQUAL");
        assert!(!op.is_push());
    }
}
