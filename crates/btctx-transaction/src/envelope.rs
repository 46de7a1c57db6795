//! Signing envelope: an unsigned transaction plus per-input signing state.
//!
//! The binary layout follows BIP174. A magic prefix is followed by a global
//! map holding the unsigned transaction, then one map per input and one per
//! output. Each map is a sequence of `<varint keylen><key><varint vallen><value>`
//! entries terminated by a zero byte; the first key byte is the entry type.
//!
//! Entries this crate does not interpret are kept in `unknown` maps and
//! written back unchanged, so an envelope survives a round trip through
//! other tools.
//!
//! The change flag of an output travels in a proprietary (`0xfc`) output
//! entry with identifier `btctx` and subtype 0.

use std::collections::BTreeMap;

use base64::Engine;
use btctx_primitives::util::{ByteReader, ByteWriter};
use btctx_script::Script;

use crate::output::TransactionOutput;
use crate::transaction::Transaction;
use crate::witness::Witness;
use crate::TransactionError;

/// `psbt` followed by `0xff`.
pub const ENVELOPE_MAGIC: [u8; 5] = [0x70, 0x73, 0x62, 0x74, 0xff];

const SEPARATOR: u8 = 0x00;

const GLOBAL_UNSIGNED_TX: u8 = 0x00;

const IN_NON_WITNESS_UTXO: u8 = 0x00;
const IN_WITNESS_UTXO: u8 = 0x01;
const IN_PARTIAL_SIG: u8 = 0x02;
const IN_SIGHASH_TYPE: u8 = 0x03;
const IN_REDEEM_SCRIPT: u8 = 0x04;
const IN_WITNESS_SCRIPT: u8 = 0x05;
const IN_FINAL_SCRIPTSIG: u8 = 0x07;
const IN_FINAL_SCRIPTWITNESS: u8 = 0x08;
const IN_TAP_KEY_SIG: u8 = 0x13;

/// Proprietary output key: type, identifier length, identifier, subtype.
const OUT_CHANGE_KEY: [u8; 8] = [0xfc, 0x05, b'b', b't', b'c', b't', b'x', 0x00];

type KeyValueMap = BTreeMap<Vec<u8>, Vec<u8>>;

/// Signing state of one input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvelopeInput {
    /// The full transaction holding the spent output.
    pub non_witness_utxo: Option<Transaction>,
    /// The spent output itself (amount and locking script).
    pub witness_utxo: Option<TransactionOutput>,
    /// ECDSA signatures keyed by the serialized public key.
    pub partial_sigs: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Hash type to sign with, if not the default for the script type.
    pub sighash_type: Option<u32>,
    pub redeem_script: Option<Script>,
    pub witness_script: Option<Script>,
    pub final_script_sig: Option<Script>,
    pub final_script_witness: Option<Witness>,
    /// BIP340 key-path signature, with the hash type byte appended unless
    /// it is `SIGHASH_DEFAULT`.
    pub tap_key_sig: Option<Vec<u8>>,
    pub unknown: KeyValueMap,
}

impl EnvelopeInput {
    /// Whether a final scriptSig or witness has been assembled.
    pub fn is_finalized(&self) -> bool {
        self.final_script_sig.is_some() || self.final_script_witness.is_some()
    }

    /// Whether either form of the spent output is attached.
    pub fn has_utxo(&self) -> bool {
        self.non_witness_utxo.is_some() || self.witness_utxo.is_some()
    }

    /// The output spent by this input, from the witness UTXO or else from
    /// output `vout` of the full prior transaction.
    pub fn spent_output(&self, vout: u32) -> Option<TransactionOutput> {
        if let Some(output) = &self.witness_utxo {
            return Some(output.clone());
        }
        self.non_witness_utxo.as_ref()?.outputs.get(vout as usize).cloned()
    }

    fn from_map(map: KeyValueMap, index: usize) -> Result<Self, TransactionError> {
        let mut input = EnvelopeInput::default();
        for (key, value) in map {
            let key_type = key[0];
            match key_type {
                IN_PARTIAL_SIG => {
                    input.partial_sigs.insert(key[1..].to_vec(), value);
                }
                IN_NON_WITNESS_UTXO
                | IN_WITNESS_UTXO
                | IN_SIGHASH_TYPE
                | IN_REDEEM_SCRIPT
                | IN_WITNESS_SCRIPT
                | IN_FINAL_SCRIPTSIG
                | IN_FINAL_SCRIPTWITNESS
                | IN_TAP_KEY_SIG => {
                    if key.len() != 1 {
                        return Err(TransactionError::SerializationError(format!(
                            "input {}: key type 0x{:02x} takes no key data",
                            index, key_type
                        )));
                    }
                    input.set_field(key_type, value, index)?;
                }
                _ => {
                    input.unknown.insert(key, value);
                }
            }
        }
        Ok(input)
    }

    fn set_field(&mut self, key_type: u8, value: Vec<u8>, index: usize) -> Result<(), TransactionError> {
        match key_type {
            IN_NON_WITNESS_UTXO => self.non_witness_utxo = Some(Transaction::from_bytes(&value)?),
            IN_WITNESS_UTXO => self.witness_utxo = Some(TransactionOutput::from_bytes(&value)?),
            IN_SIGHASH_TYPE => {
                let bytes: [u8; 4] = value.as_slice().try_into().map_err(|_| {
                    TransactionError::SerializationError(format!(
                        "input {}: sighash type must be 4 bytes, got {}",
                        index,
                        value.len()
                    ))
                })?;
                self.sighash_type = Some(u32::from_le_bytes(bytes));
            }
            IN_REDEEM_SCRIPT => self.redeem_script = Some(Script::from(value)),
            IN_WITNESS_SCRIPT => self.witness_script = Some(Script::from(value)),
            IN_FINAL_SCRIPTSIG => self.final_script_sig = Some(Script::from(value)),
            IN_FINAL_SCRIPTWITNESS => {
                let mut reader = ByteReader::new(&value);
                let witness = Witness::read_from(&mut reader)?;
                if reader.remaining() != 0 {
                    return Err(TransactionError::SerializationError(format!(
                        "input {}: trailing bytes after final witness",
                        index
                    )));
                }
                self.final_script_witness = Some(witness);
            }
            IN_TAP_KEY_SIG => {
                if value.len() != 64 && value.len() != 65 {
                    return Err(TransactionError::SerializationError(format!(
                        "input {}: taproot key signature must be 64 or 65 bytes, got {}",
                        index,
                        value.len()
                    )));
                }
                self.tap_key_sig = Some(value);
            }
            _ => {
                self.unknown.insert(vec![key_type], value);
            }
        }
        Ok(())
    }

    fn write_to(&self, writer: &mut ByteWriter) {
        if let Some(tx) = &self.non_witness_utxo {
            write_entry(writer, &[IN_NON_WITNESS_UTXO], &tx.to_bytes());
        }
        if let Some(output) = &self.witness_utxo {
            write_entry(writer, &[IN_WITNESS_UTXO], &output.to_bytes());
        }
        for (pubkey, sig) in &self.partial_sigs {
            let mut key = Vec::with_capacity(1 + pubkey.len());
            key.push(IN_PARTIAL_SIG);
            key.extend_from_slice(pubkey);
            write_entry(writer, &key, sig);
        }
        if let Some(sighash_type) = self.sighash_type {
            write_entry(writer, &[IN_SIGHASH_TYPE], &sighash_type.to_le_bytes());
        }
        if let Some(script) = &self.redeem_script {
            write_entry(writer, &[IN_REDEEM_SCRIPT], script.to_bytes());
        }
        if let Some(script) = &self.witness_script {
            write_entry(writer, &[IN_WITNESS_SCRIPT], script.to_bytes());
        }
        if let Some(script) = &self.final_script_sig {
            write_entry(writer, &[IN_FINAL_SCRIPTSIG], script.to_bytes());
        }
        if let Some(witness) = &self.final_script_witness {
            write_entry(writer, &[IN_FINAL_SCRIPTWITNESS], &witness.to_bytes());
        }
        if let Some(sig) = &self.tap_key_sig {
            write_entry(writer, &[IN_TAP_KEY_SIG], sig);
        }
        for (key, value) in &self.unknown {
            write_entry(writer, key, value);
        }
        writer.write_u8(SEPARATOR);
    }
}

/// Per-output state. Apart from the change flag, which lives on the
/// unsigned transaction output, no output fields are interpreted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvelopeOutput {
    pub unknown: KeyValueMap,
}

/// An unsigned transaction with the metadata needed to sign each input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// The transaction being signed. Its scriptSigs and witnesses stay empty.
    pub unsigned_tx: Transaction,
    /// One entry per transaction input.
    pub inputs: Vec<EnvelopeInput>,
    /// One entry per transaction output.
    pub outputs: Vec<EnvelopeOutput>,
    /// Global entries other than the unsigned transaction.
    pub unknown: KeyValueMap,
}

impl Envelope {
    /// Wrap an unsigned transaction with empty per-input state.
    ///
    /// # Returns
    /// The envelope, or `InvalidTransaction` if any input already carries a
    /// scriptSig or witness.
    pub fn from_unsigned_tx(tx: Transaction) -> Result<Self, TransactionError> {
        check_unsigned(&tx)?;
        Ok(Envelope {
            inputs: vec![EnvelopeInput::default(); tx.inputs.len()],
            outputs: vec![EnvelopeOutput::default(); tx.outputs.len()],
            unsigned_tx: tx,
            unknown: BTreeMap::new(),
        })
    }

    /// Whether every input has a final scriptSig or witness.
    pub fn is_finalized(&self) -> bool {
        self.inputs.iter().all(EnvelopeInput::is_finalized)
    }

    /// Assemble the signed transaction from the finalized inputs.
    ///
    /// # Returns
    /// The network-ready transaction, or `FinalizeFailure` naming the first
    /// input that is not finalized.
    pub fn extract(&self) -> Result<Transaction, TransactionError> {
        let mut tx = self.unsigned_tx.clone();
        for (index, (wire, input)) in tx.inputs.iter_mut().zip(&self.inputs).enumerate() {
            if !input.is_finalized() {
                return Err(TransactionError::FinalizeFailure {
                    index,
                    reason: "input is not finalized".to_string(),
                });
            }
            wire.unlocking_script = input.final_script_sig.clone();
            wire.witness = input.final_script_witness.clone().unwrap_or_default();
        }
        Ok(tx)
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(512);
        writer.write_bytes(&ENVELOPE_MAGIC);

        write_entry(&mut writer, &[GLOBAL_UNSIGNED_TX], &self.unsigned_tx.to_bytes_no_witness());
        for (key, value) in &self.unknown {
            write_entry(&mut writer, key, value);
        }
        writer.write_u8(SEPARATOR);

        for input in &self.inputs {
            input.write_to(&mut writer);
        }
        for (index, output) in self.outputs.iter().enumerate() {
            let change = self.unsigned_tx.outputs.get(index).is_some_and(|o| o.change);
            if change {
                write_entry(&mut writer, &OUT_CHANGE_KEY, &[0x01]);
            }
            for (key, value) in &output.unknown {
                if key.as_slice() != OUT_CHANGE_KEY.as_slice() {
                    write_entry(&mut writer, key, value);
                }
            }
            writer.write_u8(SEPARATOR);
        }
        writer.into_bytes()
    }

    /// Parse a binary envelope.
    ///
    /// # Returns
    /// The envelope, or `SerializationError` for a bad magic, a duplicate
    /// key, a missing unsigned transaction, a truncated map or trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let magic = reader
            .read_array::<5>()
            .map_err(|e| TransactionError::SerializationError(format!("reading magic: {}", e)))?;
        if magic != ENVELOPE_MAGIC {
            return Err(TransactionError::SerializationError("bad envelope magic".to_string()));
        }

        let mut global = read_map(&mut reader, "global")?;
        let tx_bytes = global.remove(&vec![GLOBAL_UNSIGNED_TX]).ok_or_else(|| {
            TransactionError::SerializationError("missing unsigned transaction".to_string())
        })?;
        let mut unsigned_tx = Transaction::from_bytes(&tx_bytes)?;
        check_unsigned(&unsigned_tx)?;

        let mut inputs = Vec::with_capacity(unsigned_tx.inputs.len());
        for index in 0..unsigned_tx.inputs.len() {
            let map = read_map(&mut reader, "input")?;
            inputs.push(EnvelopeInput::from_map(map, index)?);
        }
        let mut outputs = Vec::with_capacity(unsigned_tx.outputs.len());
        for index in 0..unsigned_tx.outputs.len() {
            let mut unknown = read_map(&mut reader, "output")?;
            if let Some(flag) = unknown.remove(OUT_CHANGE_KEY.as_slice()) {
                if flag != [0x01] {
                    return Err(TransactionError::SerializationError(format!(
                        "output {}: bad change marker {}",
                        index,
                        hex::encode(&flag)
                    )));
                }
                unsigned_tx.outputs[index].change = true;
            }
            outputs.push(EnvelopeOutput { unknown });
        }
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "{} trailing bytes after envelope",
                reader.remaining()
            )));
        }

        Ok(Envelope {
            unsigned_tx,
            inputs,
            outputs,
            unknown: global,
        })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str.trim())
            .map_err(|e| TransactionError::SerializationError(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.to_bytes())
    }

    pub fn from_base64(encoded: &str) -> Result<Self, TransactionError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| TransactionError::SerializationError(format!("invalid base64: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Parse an envelope given as either hex or base64 text.
    pub fn decode(text: &str) -> Result<Self, TransactionError> {
        let text = text.trim();
        if text.len() % 2 == 0 && text.bytes().all(|b| b.is_ascii_hexdigit()) {
            Self::from_hex(text)
        } else {
            Self::from_base64(text)
        }
    }
}

fn check_unsigned(tx: &Transaction) -> Result<(), TransactionError> {
    for (index, input) in tx.inputs.iter().enumerate() {
        if input.is_signed() {
            return Err(TransactionError::InvalidTransaction(format!(
                "input {} of an unsigned transaction carries a scriptSig or witness",
                index
            )));
        }
    }
    Ok(())
}

fn write_entry(writer: &mut ByteWriter, key: &[u8], value: &[u8]) {
    writer.write_var_bytes(key);
    writer.write_var_bytes(value);
}

fn read_map(reader: &mut ByteReader, scope: &str) -> Result<KeyValueMap, TransactionError> {
    let mut map = BTreeMap::new();
    loop {
        let key = reader.read_var_bytes().map_err(|e| {
            TransactionError::SerializationError(format!("reading {} key: {}", scope, e))
        })?;
        if key.is_empty() {
            return Ok(map);
        }
        let value = reader.read_var_bytes().map_err(|e| {
            TransactionError::SerializationError(format!("reading {} value: {}", scope, e))
        })?;
        if map.insert(key.to_vec(), value.to_vec()).is_some() {
            return Err(TransactionError::SerializationError(format!(
                "duplicate {} key {}",
                scope,
                hex::encode(key)
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::TransactionInput;
    use btctx_primitives::chainhash::Hash;

    fn unsigned() -> Transaction {
        let mut tx = Transaction::new();
        tx.add_input(TransactionInput::from_outpoint(&Hash::new([0x42; 32]), 1));
        tx.add_output(TransactionOutput::with_script(
            1000,
            Script::from_hex("0014751e76e8199196d454941c45d1b3a323f1433bd6").unwrap(),
        ));
        tx
    }

    #[test]
    fn test_empty_envelope_bytes() {
        let envelope = Envelope::from_unsigned_tx(unsigned()).unwrap();
        let bytes = envelope.to_bytes();
        assert_eq!(&bytes[..5], b"psbt\xff");
        // Global entry: key 0x01 0x00, then the unsigned tx.
        assert_eq!(&bytes[5..7], &[0x01, 0x00]);
        // Global, input and output separators close the envelope.
        assert_eq!(&bytes[bytes.len() - 3..], &[0x00, 0x00, 0x00]);
        assert_eq!(Envelope::from_bytes(&bytes).unwrap(), envelope);
    }

    #[test]
    fn test_round_trip_with_fields() {
        let mut envelope = Envelope::from_unsigned_tx(unsigned()).unwrap();
        let input = &mut envelope.inputs[0];
        input.witness_utxo = Some(TransactionOutput::with_script(
            2000,
            Script::from_hex("0014751e76e8199196d454941c45d1b3a323f1433bd6").unwrap(),
        ));
        input.sighash_type = Some(1);
        input.partial_sigs.insert(vec![0x02; 33], vec![0x30, 0x01]);
        input.redeem_script = Some(Script::from_bytes(&[0x51]));
        input.final_script_witness = Some(Witness::from_items(vec![vec![1, 2], vec![3]]));
        input.tap_key_sig = Some(vec![7; 64]);
        input.unknown.insert(vec![0xfc, 0x01], vec![0xff]);
        envelope.outputs[0].unknown.insert(vec![0x02], vec![0x00; 3]);
        envelope.unknown.insert(vec![0xfb], vec![0, 0, 0, 0]);

        let decoded = Envelope::from_hex(&envelope.to_hex()).unwrap();
        assert_eq!(decoded, envelope);
        let decoded = Envelope::from_base64(&envelope.to_base64()).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(Envelope::decode(&envelope.to_base64()).unwrap(), envelope);
        assert_eq!(Envelope::decode(&envelope.to_hex()).unwrap(), envelope);
    }

    #[test]
    fn test_change_flag_survives_round_trip() {
        let mut tx = unsigned();
        let mut change = TransactionOutput::with_script(500, Script::from_bytes(&[0x51]));
        change.change = true;
        tx.add_output(change);
        let envelope = Envelope::from_unsigned_tx(tx).unwrap();

        let bytes = envelope.to_bytes();
        let decoded = Envelope::from_bytes(&bytes).unwrap();
        assert!(!decoded.unsigned_tx.outputs[0].change);
        assert!(decoded.unsigned_tx.outputs[1].change);
        assert!(decoded.outputs[1].unknown.is_empty());
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.to_bytes(), bytes);
        // The flag is not part of the transaction itself.
        assert_eq!(decoded.unsigned_tx.tx_id(), envelope.unsigned_tx.tx_id());
    }

    #[test]
    fn test_rejects_bad_change_marker() {
        let mut writer = ByteWriter::new();
        writer.write_bytes(&ENVELOPE_MAGIC);
        write_entry(&mut writer, &[GLOBAL_UNSIGNED_TX], &unsigned().to_bytes());
        writer.write_u8(SEPARATOR);
        writer.write_u8(SEPARATOR);
        write_entry(&mut writer, &OUT_CHANGE_KEY, &[0x02]);
        writer.write_u8(SEPARATOR);
        assert!(matches!(
            Envelope::from_bytes(writer.as_bytes()),
            Err(TransactionError::SerializationError(_))
        ));
    }

    #[test]
    fn test_rejects_signed_transaction() {
        let mut tx = unsigned();
        tx.inputs[0].witness.push(vec![1]);
        assert!(Envelope::from_unsigned_tx(tx).is_err());
    }

    #[test]
    fn test_rejects_bad_magic_and_duplicates() {
        let envelope = Envelope::from_unsigned_tx(unsigned()).unwrap();
        let mut bytes = envelope.to_bytes();
        bytes[4] = 0x00;
        assert!(Envelope::from_bytes(&bytes).is_err());

        // Two sighash entries in the input map.
        let mut writer = ByteWriter::new();
        writer.write_bytes(&ENVELOPE_MAGIC);
        write_entry(&mut writer, &[GLOBAL_UNSIGNED_TX], &unsigned().to_bytes());
        writer.write_u8(SEPARATOR);
        write_entry(&mut writer, &[IN_SIGHASH_TYPE], &1u32.to_le_bytes());
        write_entry(&mut writer, &[IN_SIGHASH_TYPE], &1u32.to_le_bytes());
        writer.write_u8(SEPARATOR);
        writer.write_u8(SEPARATOR);
        assert!(matches!(
            Envelope::from_bytes(writer.as_bytes()),
            Err(TransactionError::SerializationError(_))
        ));
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut bytes = Envelope::from_unsigned_tx(unsigned()).unwrap().to_bytes();
        bytes.push(0x00);
        assert!(Envelope::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_extract_requires_finalized_inputs() {
        let mut envelope = Envelope::from_unsigned_tx(unsigned()).unwrap();
        assert!(!envelope.is_finalized());
        assert!(matches!(
            envelope.extract(),
            Err(TransactionError::FinalizeFailure { index: 0, .. })
        ));

        envelope.inputs[0].final_script_witness = Some(Witness::from_items(vec![vec![0xaa; 64]]));
        let tx = envelope.extract().unwrap();
        assert!(tx.has_witness());
        assert_eq!(tx.tx_id(), envelope.unsigned_tx.tx_id());
        assert_ne!(tx.wtx_id(), tx.tx_id());
    }
}
