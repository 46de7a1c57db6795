/// Script type - a sequence of opcodes and data pushes.
///
/// Scripts lock transaction outputs and unlock inputs. `Script` wraps a
/// `Vec<u8>` and provides constructors for every standard output layout,
/// classification of those layouts, and the few rewrites digest computation
/// needs.

use std::fmt;

use crate::chunk::{decode_script, push_data_prefix, ScriptChunk};
use crate::opcodes::*;
use crate::ScriptError;

/// Smallest and largest witness program lengths.
const MIN_WITNESS_PROGRAM: usize = 2;
const MAX_WITNESS_PROGRAM: usize = 40;

/// A script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or an error if the hex is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        let bytes = hex::decode(hex_str).map_err(|e| ScriptError::InvalidHex(e.to_string()))?;
        Ok(Script(bytes))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Create a script from an ASM string.
    ///
    /// Known opcode names are emitted directly; any other token is treated
    /// as hex push data.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        for section in asm.split_whitespace() {
            if let Some(opcode) = string_to_opcode(section) {
                script.append_opcodes(&[opcode])?;
            } else {
                script.append_push_data_hex(section)?;
            }
        }
        Ok(script)
    }

    // -----------------------------------------------------------------------
    // Standard locking scripts
    // -----------------------------------------------------------------------

    /// `<pubkey> OP_CHECKSIG`
    ///
    /// # Arguments
    /// * `pubkey` - Serialized public key, compressed or uncompressed.
    pub fn p2pk(pubkey: &[u8]) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        script.append_push_data(pubkey)?;
        script.0.push(OP_CHECKSIG);
        Ok(script)
    }

    /// `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`
    pub fn p2pkh(pubkey_hash: &[u8; 20]) -> Self {
        let mut b = Vec::with_capacity(25);
        b.extend_from_slice(&[OP_DUP, OP_HASH160, OP_DATA_20]);
        b.extend_from_slice(pubkey_hash);
        b.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        Script(b)
    }

    /// `OP_HASH160 <20 bytes> OP_EQUAL`
    pub fn p2sh(script_hash: &[u8; 20]) -> Self {
        let mut b = Vec::with_capacity(23);
        b.extend_from_slice(&[OP_HASH160, OP_DATA_20]);
        b.extend_from_slice(script_hash);
        b.push(OP_EQUAL);
        Script(b)
    }

    /// `OP_0 <20 bytes>`
    pub fn p2wpkh(pubkey_hash: &[u8; 20]) -> Self {
        Self::witness_v(OP_0, pubkey_hash)
    }

    /// `OP_0 <32 bytes>`
    pub fn p2wsh(script_hash: &[u8; 32]) -> Self {
        Self::witness_v(OP_0, script_hash)
    }

    /// `OP_1 <32-byte x-only output key>`
    pub fn p2tr(output_key: &[u8; 32]) -> Self {
        Self::witness_v(OP_1, output_key)
    }

    /// `OP_RETURN <data>`, an unspendable data carrier.
    ///
    /// # Returns
    /// The script, or an error if the data is too large for one push.
    pub fn op_return(data: &[u8]) -> Result<Self, ScriptError> {
        let mut script = Script(vec![OP_RETURN]);
        script.append_push_data(data)?;
        Ok(script)
    }

    fn witness_v(version_op: u8, program: &[u8]) -> Self {
        let mut b = Vec::with_capacity(program.len() + 2);
        b.push(version_op);
        b.push(program.len() as u8);
        b.extend_from_slice(program);
        Script(b)
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Convert the script to its ASM representation.
    ///
    /// # Returns
    /// A space-separated ASM string, or an empty string if the script does
    /// not parse.
    pub fn to_asm(&self) -> String {
        match self.chunks() {
            Ok(chunks) => chunks
                .iter()
                .map(ScriptChunk::to_asm_string)
                .collect::<Vec<_>>()
                .join(" "),
            Err(_) => String::new(),
        }
    }

    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // -----------------------------------------------------------------------
    // Script classification
    // -----------------------------------------------------------------------

    /// Pattern: OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Pattern: <pubkey> OP_CHECKSIG, with a 33-byte compressed or 65-byte
    /// uncompressed key.
    pub fn is_p2pk(&self) -> bool {
        self.p2pk_public_key().is_ok()
    }

    /// Pattern: OP_HASH160 <20 bytes> OP_EQUAL
    pub fn is_p2sh(&self) -> bool {
        let b = &self.0;
        b.len() == 23 && b[0] == OP_HASH160 && b[1] == OP_DATA_20 && b[22] == OP_EQUAL
    }

    /// Pattern: OP_0 <20 bytes>
    pub fn is_p2wpkh(&self) -> bool {
        matches!(self.witness_program(), Some((0, p)) if p.len() == 20)
    }

    /// Pattern: OP_0 <32 bytes>
    pub fn is_p2wsh(&self) -> bool {
        matches!(self.witness_program(), Some((0, p)) if p.len() == 32)
    }

    /// Pattern: OP_1 <32 bytes>
    pub fn is_p2tr(&self) -> bool {
        matches!(self.witness_program(), Some((1, p)) if p.len() == 32)
    }

    /// Split a witness program into its version and program bytes.
    ///
    /// A witness program is a version opcode (`OP_0`, `OP_1`..`OP_16`)
    /// followed by a single direct push of 2 to 40 bytes.
    pub fn witness_program(&self) -> Option<(u8, &[u8])> {
        let b = &self.0;
        if b.len() < 2 + MIN_WITNESS_PROGRAM || b.len() > 2 + MAX_WITNESS_PROGRAM {
            return None;
        }
        if b[0] != OP_0 && !(OP_1..=OP_16).contains(&b[0]) {
            return None;
        }
        if b[1] as usize != b.len() - 2 {
            return None;
        }
        Some((small_int_value(b[0])?, &b[2..]))
    }

    pub fn is_witness_program(&self) -> bool {
        self.witness_program().is_some()
    }

    /// Whether the script begins with OP_RETURN or OP_FALSE OP_RETURN.
    pub fn is_data(&self) -> bool {
        let b = &self.0;
        (!b.is_empty() && b[0] == OP_RETURN) || (b.len() > 1 && b[0] == OP_FALSE && b[1] == OP_RETURN)
    }

    /// Pattern: OP_M <pubkey>... OP_N OP_CHECKMULTISIG
    pub fn is_multisig_out(&self) -> bool {
        let parts = match self.chunks() {
            Ok(p) => p,
            Err(_) => return false,
        };
        if parts.len() < 3 || !is_small_int_op(parts[0].op) {
            return false;
        }
        let keys_ok = parts[1..parts.len() - 2]
            .iter()
            .all(|c| matches!(&c.data, Some(d) if !d.is_empty()));
        keys_ok && is_small_int_op(parts[parts.len() - 2].op) && parts[parts.len() - 1].op == OP_CHECKMULTISIG
    }

    // -----------------------------------------------------------------------
    // Data extraction
    // -----------------------------------------------------------------------

    /// The 20-byte key hash of a P2PKH script.
    pub fn public_key_hash(&self) -> Result<[u8; 20], ScriptError> {
        if self.0.is_empty() {
            return Err(ScriptError::EmptyScript);
        }
        if !self.is_p2pkh() {
            return Err(ScriptError::WrongScriptType("P2PKH"));
        }
        Ok(to_array(&self.0[3..23]))
    }

    /// The 20-byte script hash of a P2SH script.
    pub fn script_hash(&self) -> Result<[u8; 20], ScriptError> {
        if !self.is_p2sh() {
            return Err(ScriptError::WrongScriptType("P2SH"));
        }
        Ok(to_array(&self.0[2..22]))
    }

    /// The serialized public key of a P2PK script.
    pub fn p2pk_public_key(&self) -> Result<&[u8], ScriptError> {
        let b = &self.0;
        let key = match b.first() {
            Some(&OP_DATA_33) if b.len() == 35 => &b[1..34],
            Some(&OP_DATA_65) if b.len() == 67 => &b[1..66],
            _ => return Err(ScriptError::WrongScriptType("P2PK")),
        };
        let prefix_ok = match key.len() {
            33 => key[0] == 0x02 || key[0] == 0x03,
            _ => key[0] == 0x04 || key[0] == 0x06 || key[0] == 0x07,
        };
        if !prefix_ok || b[b.len() - 1] != OP_CHECKSIG {
            return Err(ScriptError::WrongScriptType("P2PK"));
        }
        Ok(key)
    }

    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    /// A copy of the script with every `OP_CODESEPARATOR` removed.
    ///
    /// Push data is copied byte for byte, including non-minimal push
    /// encodings. Scripts that fail to parse are returned unchanged.
    pub fn remove_op_codeseparators(&self) -> Script {
        let chunks = match self.chunks() {
            Ok(c) => c,
            Err(_) => return self.clone(),
        };
        let mut out = Vec::with_capacity(self.0.len());
        for chunk in chunks.iter().filter(|c| c.op != OP_CODESEPARATOR) {
            out.push(chunk.op);
            if let Some(data) = &chunk.data {
                let len = data.len();
                match chunk.op {
                    OP_PUSHDATA1 => out.push(len as u8),
                    OP_PUSHDATA2 => out.extend_from_slice(&(len as u16).to_le_bytes()),
                    OP_PUSHDATA4 => out.extend_from_slice(&(len as u32).to_le_bytes()),
                    _ => {}
                }
                out.extend_from_slice(data);
            }
        }
        Script(out)
    }

    // -----------------------------------------------------------------------
    // Mutation / building
    // -----------------------------------------------------------------------

    /// Append data bytes with the minimal push prefix.
    ///
    /// # Returns
    /// `Ok(())` on success, or an error if the data is too large.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    pub fn append_push_data_hex(&mut self, hex_str: &str) -> Result<(), ScriptError> {
        let data = hex::decode(hex_str).map_err(|_| ScriptError::InvalidOpcodeData)?;
        self.append_push_data(&data)
    }

    /// Append raw opcodes.
    ///
    /// Rejects push opcodes (OP_DATA_1..OP_PUSHDATA4); use
    /// `append_push_data` for those.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        if let Some(&op) = opcodes.iter().find(|&&op| (OP_DATA_1..=OP_PUSHDATA4).contains(&op)) {
            return Err(ScriptError::InvalidOpcodeType(opcode_to_string(op)));
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }
}

fn to_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P2PKH_HEX: &str = "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac";
    const P2SH_HEX: &str = "a9149de5aeaff9c48431ba4dd6e8af73d51f38e451cb87";
    const P2PK_HEX: &str = "2102f0d97c290e79bf2a8660c406aa56b6f189ff79f2245cc5aff82808b58131b4d5ac";

    // -----------------------------------------------------------------------
    // Construction & ASM
    // -----------------------------------------------------------------------

    #[test]
    fn test_op_return() {
        let script = Script::op_return(b"hello").unwrap();
        assert_eq!(script.to_hex(), "6a0568656c6c6f");
        assert!(script.is_data());
        assert!(!script.is_witness_program());

        let long = Script::op_return(&[0xab; 80]).unwrap();
        assert_eq!(&long.to_bytes()[..3], &[0x6a, 0x4c, 80]);
        assert_eq!(long.len(), 83);
    }

    #[test]
    fn test_hex_and_asm() {
        let script = Script::from_hex(P2PKH_HEX).unwrap();
        assert_eq!(script.to_hex(), P2PKH_HEX);
        assert_eq!(
            script.to_asm(),
            "OP_DUP OP_HASH160 e2a623699e81b291c0327f408fea765d534baa2a OP_EQUALVERIFY OP_CHECKSIG"
        );
        let back = Script::from_asm(&script.to_asm()).unwrap();
        assert_eq!(back, script);
        assert!(Script::from_hex("ZZ").is_err());
        assert!(Script::from_asm("").unwrap().is_empty());
    }

    #[test]
    fn test_standard_builders() {
        let hash20 = [0x5cu8; 20];
        let hash32 = [0xb7u8; 32];

        let p2pkh = Script::p2pkh(&hash20);
        assert!(p2pkh.is_p2pkh());
        assert_eq!(p2pkh.len(), 25);
        assert_eq!(p2pkh.public_key_hash().unwrap(), hash20);

        let p2sh = Script::p2sh(&hash20);
        assert!(p2sh.is_p2sh());
        assert_eq!(p2sh.len(), 23);
        assert_eq!(p2sh.script_hash().unwrap(), hash20);

        let p2wpkh = Script::p2wpkh(&hash20);
        assert!(p2wpkh.is_p2wpkh() && !p2wpkh.is_p2wsh());
        assert_eq!(p2wpkh.len(), 22);

        let p2wsh = Script::p2wsh(&hash32);
        assert!(p2wsh.is_p2wsh() && !p2wsh.is_p2tr());
        assert_eq!(p2wsh.len(), 34);

        let p2tr = Script::p2tr(&hash32);
        assert!(p2tr.is_p2tr() && !p2tr.is_p2wsh());
        assert_eq!(p2tr.witness_program(), Some((1, &hash32[..])));
        assert_eq!(&p2tr.to_hex()[..4], "5120");
    }

    #[test]
    fn test_p2pk_detection() {
        let script = Script::from_hex(P2PK_HEX).unwrap();
        assert!(script.is_p2pk());
        assert_eq!(script.p2pk_public_key().unwrap().len(), 33);
        assert!(!script.is_p2pkh());

        let built = Script::p2pk(script.p2pk_public_key().unwrap()).unwrap();
        assert_eq!(built, script);

        let mut bad_prefix = hex::decode(P2PK_HEX).unwrap();
        bad_prefix[1] = 0x05;
        assert!(!Script::from_bytes(&bad_prefix).is_p2pk());
    }

    #[test]
    fn test_classification_is_exclusive() {
        let scripts = [
            Script::from_hex(P2PKH_HEX).unwrap(),
            Script::from_hex(P2SH_HEX).unwrap(),
            Script::from_hex(P2PK_HEX).unwrap(),
            Script::p2wpkh(&[1u8; 20]),
            Script::p2wsh(&[2u8; 32]),
            Script::p2tr(&[3u8; 32]),
        ];
        for script in &scripts {
            let hits = [
                script.is_p2pkh(),
                script.is_p2sh(),
                script.is_p2pk(),
                script.is_p2wpkh(),
                script.is_p2wsh(),
                script.is_p2tr(),
            ]
            .iter()
            .filter(|b| **b)
            .count();
            assert_eq!(hits, 1, "{}", script);
        }
    }

    #[test]
    fn test_witness_program_bounds() {
        // version 16, 2-byte program
        assert_eq!(Script::from_hex("60020102").unwrap().witness_program(), Some((16, &[1u8, 2][..])));
        // 1-byte program is too short
        assert!(Script::from_hex("000101").unwrap().witness_program().is_none());
        // length byte disagrees with script length
        assert!(Script::from_hex("0014aabb").unwrap().witness_program().is_none());
        // OP_1NEGATE is not a version opcode
        assert!(Script::from_hex("4f020102").unwrap().witness_program().is_none());
    }

    #[test]
    fn test_data_and_multisig() {
        assert!(Script::from_bytes(&[OP_RETURN, 0x01, 0xaa]).is_data());
        assert!(Script::from_bytes(&[OP_FALSE, OP_RETURN]).is_data());
        assert!(!Script::from_hex(P2PKH_HEX).unwrap().is_data());
        assert!(Script::from_hex("5201110122013353ae").unwrap().is_multisig_out());
        assert!(!Script::from_hex(P2PKH_HEX).unwrap().is_multisig_out());
    }

    #[test]
    fn test_extraction_errors() {
        assert!(matches!(Script::new().public_key_hash(), Err(ScriptError::EmptyScript)));
        assert!(Script::from_hex("76").unwrap().public_key_hash().is_err());
        assert!(Script::from_hex(P2PKH_HEX).unwrap().script_hash().is_err());
    }

    #[test]
    fn test_remove_op_codeseparators() {
        // OP_DUP OP_CODESEPARATOR <2 bytes> OP_CODESEPARATOR OP_CHECKSIG
        let cleaned = Script::from_hex("76ab02abababac").unwrap().remove_op_codeseparators();
        // Separator bytes inside push data are kept.
        assert_eq!(cleaned.to_hex(), "7602ababac");

        // Non-minimal OP_PUSHDATA1 encoding survives untouched.
        let nonminimal = Script::from_hex("4c01ffab").unwrap().remove_op_codeseparators();
        assert_eq!(nonminimal.to_hex(), "4c01ff");

        let truncated = Script::from_hex("ab05").unwrap();
        assert_eq!(truncated.remove_op_codeseparators(), truncated);
    }

    #[test]
    fn test_append_operations() {
        let mut script = Script::new();
        script.append_push_data(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(script.to_hex(), "050102030405");

        let mut medium = Script::new();
        medium.append_push_data(&[0xaa; 80]).unwrap();
        assert_eq!(&medium.to_hex()[..4], "4c50");

        let mut ops = Script::from_asm("OP_2 OP_2 OP_ADD").unwrap();
        ops.append_opcodes(&[OP_EQUALVERIFY]).unwrap();
        assert_eq!(ops.to_asm(), "OP_2 OP_2 OP_ADD OP_EQUALVERIFY");
        assert!(ops.append_opcodes(&[OP_EQUAL, OP_PUSHDATA1]).is_err());
    }

    #[test]
    fn test_serde_and_display() {
        let script = Script::from_asm("OP_2 OP_2 OP_ADD OP_4 OP_EQUALVERIFY").unwrap();
        assert_eq!(serde_json::to_string(&script).unwrap(), r#""5252935488""#);
        let back: Script = serde_json::from_str(r#""5252935488""#).unwrap();
        assert_eq!(back, script);
        assert_eq!(format!("{}", script), "5252935488");
        assert_eq!(format!("{:?}", script), "Script(5252935488)");
    }
}
