/// Address encoding, decoding and locking-script classification.
///
/// Key-hash and script-hash addresses use Base58Check with the network's
/// version bytes. Witness programs use bech32 (version 0) or bech32m
/// (version 1) under the network's HRP. Pay-to-pubkey has no address form;
/// the hex of the serialized key stands in for one.

use std::fmt;
use std::str::FromStr;

use bech32::segwit;
use bech32::{Fe32, Hrp};
use btctx_primitives::base58;
use btctx_primitives::ec::PublicKey;
use btctx_primitives::hash::{hash160, sha256};
use btctx_primitives::schnorr::{tweak_public_key, XOnlyPublicKey};

use crate::network::Network;
use crate::script::Script;
use crate::ScriptError;

/// Locking script layouts that can be funded and spent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressType {
    /// `<pubkey> OP_CHECKSIG`
    P2pk,
    /// Legacy key hash.
    P2pkh,
    /// Native segwit v0 key hash.
    P2wpkh,
    /// Segwit v0 key hash wrapped in P2SH.
    P2wpkhNested,
    /// Native segwit v0 script hash.
    P2wsh,
    /// Segwit v0 script hash wrapped in P2SH.
    P2wshNested,
    /// Segwit v1 key-path output.
    P2tr,
}

impl AddressType {
    pub const ALL: [AddressType; 7] = [
        AddressType::P2pk,
        AddressType::P2pkh,
        AddressType::P2wpkh,
        AddressType::P2wpkhNested,
        AddressType::P2wsh,
        AddressType::P2wshNested,
        AddressType::P2tr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::P2pk => "P2PK",
            AddressType::P2pkh => "P2PKH",
            AddressType::P2wpkh => "P2WPKH",
            AddressType::P2wpkhNested => "P2WPKH_NESTED",
            AddressType::P2wsh => "P2WSH",
            AddressType::P2wshNested => "P2WSH_NESTED",
            AddressType::P2tr => "P2TR",
        }
    }

    /// Whether spending this type puts data in the witness.
    pub fn is_segwit(&self) -> bool {
        !matches!(self, AddressType::P2pk | AddressType::P2pkh)
    }

    /// Whether this type is encoded as a bech32/bech32m string.
    pub fn is_native_segwit(&self) -> bool {
        matches!(self, AddressType::P2wpkh | AddressType::P2wsh | AddressType::P2tr)
    }

    /// Length of the locking script this type produces.
    pub fn script_len(&self) -> usize {
        match self {
            AddressType::P2pkh => 25,
            AddressType::P2wpkhNested | AddressType::P2wshNested => 23,
            AddressType::P2wpkh => 22,
            AddressType::P2wsh | AddressType::P2tr => 34,
            AddressType::P2pk => 35,
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressType {
    type Err = ScriptError;

    /// Case-insensitive; `-` and `_` are interchangeable and `taproot` is
    /// accepted for `P2TR`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.to_ascii_uppercase().replace('-', "_");
        if norm == "TAPROOT" {
            return Ok(AddressType::P2tr);
        }
        AddressType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == norm)
            .ok_or_else(|| ScriptError::UnsupportedAddressType(s.to_string()))
    }
}

impl serde::Serialize for AddressType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for AddressType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A decoded address together with its locking script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    /// The encoded address string.
    pub address_string: String,
    /// The locking script paying to this address.
    pub script: Script,
    /// The classified layout of `script`.
    pub address_type: AddressType,
    /// The network the address was encoded for.
    pub network: Network,
}

impl Address {
    /// Build the address of `address_type` owned by `pubkey`.
    ///
    /// P2WSH types commit to the single-key witness script
    /// `<pubkey> OP_CHECKSIG`. P2TR commits to the key-path-only tweak of
    /// the key's x coordinate.
    ///
    /// # Returns
    /// The address, or `UnsupportedNetwork` when a segwit type is requested
    /// on a network without an HRP.
    pub fn from_public_key(
        pubkey: &PublicKey,
        address_type: AddressType,
        network: Network,
    ) -> Result<Self, ScriptError> {
        let script = match address_type {
            AddressType::P2pk => Script::p2pk(&pubkey.serialize())?,
            AddressType::P2pkh => Script::p2pkh(&pubkey.hash160()),
            AddressType::P2wpkh => Script::p2wpkh(&pubkey.hash160()),
            AddressType::P2wpkhNested => Script::p2sh(&hash160(Script::p2wpkh(&pubkey.hash160()).to_bytes())),
            AddressType::P2wsh | AddressType::P2wshNested => {
                let witness_script = Script::p2pk(&pubkey.serialize())?;
                return Self::from_witness_script(&witness_script, address_type == AddressType::P2wshNested, network);
            }
            AddressType::P2tr => {
                let (output_key, _) = tweak_public_key(&XOnlyPublicKey::from(pubkey), None)?;
                Script::p2tr(output_key.as_bytes())
            }
        };
        if address_type.is_segwit() {
            network.bech32_hrp()?;
        }
        let address_string = encode_script(&script, address_type, network)?;
        Ok(Address {
            address_string,
            script,
            address_type,
            network,
        })
    }

    /// Build a P2WSH address, optionally P2SH-wrapped, for `witness_script`.
    pub fn from_witness_script(
        witness_script: &Script,
        nested: bool,
        network: Network,
    ) -> Result<Self, ScriptError> {
        network.bech32_hrp()?;
        let program = Script::p2wsh(&sha256(witness_script.to_bytes()));
        let (script, address_type) = if nested {
            (Script::p2sh(&hash160(program.to_bytes())), AddressType::P2wshNested)
        } else {
            (program, AddressType::P2wsh)
        };
        let address_string = encode_script(&script, address_type, network)?;
        Ok(Address {
            address_string,
            script,
            address_type,
            network,
        })
    }

    /// Build the address paying to an existing locking script.
    pub fn from_script(script: &Script, network: Network) -> Result<Self, ScriptError> {
        let address_type = classify(script)?;
        let address_string = encode_script(script, address_type, network)?;
        Ok(Address {
            address_string,
            script: script.clone(),
            address_type,
            network,
        })
    }

    /// Parse an address string for `network`.
    ///
    /// # Returns
    /// The decoded address, `NetworkMismatch` if it belongs to another
    /// network, or `InvalidAddress` if it is not an address at all.
    pub fn decode(address: &str, network: Network) -> Result<Self, ScriptError> {
        let (script, address_type) = decode(address, network)?;
        Ok(Address {
            address_string: address.to_string(),
            script,
            address_type,
            network,
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address_string)
    }
}

/// Encode the address of `address_type` for a serialized public key.
pub fn encode(pubkey: &[u8], address_type: AddressType, network: Network) -> Result<String, ScriptError> {
    let key = PublicKey::from_bytes(pubkey)?;
    Ok(Address::from_public_key(&key, address_type, network)?.address_string)
}

/// Decode an address into its locking script and type.
///
/// Script-hash addresses decode as [`AddressType::P2wpkhNested`]: the hash
/// does not reveal the redeem script, and nested key hash is the layout
/// this crate produces for P2SH.
pub fn decode(address: &str, network: Network) -> Result<(Script, AddressType), ScriptError> {
    let params = network.params();

    if let Some(hrp) = params.bech32_hrp {
        let lower = address.to_ascii_lowercase();
        if lower.starts_with(&format!("{}1", hrp)) {
            return decode_segwit(address, hrp, network);
        }
    }

    if let Ok((version, payload)) = base58::check_decode_version(address) {
        let hash: [u8; 20] = payload
            .as_slice()
            .try_into()
            .map_err(|_| ScriptError::InvalidAddress(format!("bad payload length for '{}'", address)))?;
        return if version == params.pubkey_hash_addr_id {
            Ok((Script::p2pkh(&hash), AddressType::P2pkh))
        } else if version == params.script_hash_addr_id {
            Ok((Script::p2sh(&hash), AddressType::P2wpkhNested))
        } else {
            Err(ScriptError::NetworkMismatch {
                address: address.to_string(),
                network: network.to_string(),
            })
        };
    }

    if let Ok(key) = PublicKey::from_hex(address) {
        return Ok((Script::p2pk(&key.serialize())?, AddressType::P2pk));
    }

    if segwit::decode(address).is_ok() {
        return Err(ScriptError::NetworkMismatch {
            address: address.to_string(),
            network: network.to_string(),
        });
    }
    Err(ScriptError::InvalidAddress(address.to_string()))
}

fn decode_segwit(address: &str, hrp: &str, network: Network) -> Result<(Script, AddressType), ScriptError> {
    let (decoded_hrp, version, program) =
        segwit::decode(address).map_err(|e| ScriptError::InvalidAddress(format!("{}: {}", address, e)))?;
    if decoded_hrp.to_lowercase() != hrp {
        return Err(ScriptError::NetworkMismatch {
            address: address.to_string(),
            network: network.to_string(),
        });
    }
    match (version.to_u8(), program.len()) {
        (0, 20) => Ok((Script::p2wpkh(&to_array(&program)), AddressType::P2wpkh)),
        (0, 32) => Ok((Script::p2wsh(&to_array(&program)), AddressType::P2wsh)),
        (1, 32) => Ok((Script::p2tr(&to_array(&program)), AddressType::P2tr)),
        (v, n) => Err(ScriptError::UnsupportedAddressType(format!(
            "witness v{} program of {} bytes",
            v, n
        ))),
    }
}

/// Classify a locking script.
///
/// Exactly one type matches any supported script. P2SH classifies as
/// [`AddressType::P2wpkhNested`].
///
/// # Returns
/// The type, or `UnsupportedAddressType` for multisig, data carriers and
/// unknown witness versions.
pub fn classify(script: &Script) -> Result<AddressType, ScriptError> {
    if script.is_p2pkh() {
        Ok(AddressType::P2pkh)
    } else if script.is_p2wpkh() {
        Ok(AddressType::P2wpkh)
    } else if script.is_p2sh() {
        Ok(AddressType::P2wpkhNested)
    } else if script.is_p2tr() {
        Ok(AddressType::P2tr)
    } else if script.is_p2wsh() {
        Ok(AddressType::P2wsh)
    } else if script.is_p2pk() {
        Ok(AddressType::P2pk)
    } else {
        Err(ScriptError::UnsupportedAddressType(format!("script {}", script)))
    }
}

/// Encode a locking script already known to be of `address_type`.
fn encode_script(script: &Script, address_type: AddressType, network: Network) -> Result<String, ScriptError> {
    let params = network.params();
    match address_type {
        AddressType::P2pk => Ok(hex::encode(script.p2pk_public_key()?)),
        AddressType::P2pkh => Ok(base58::check_encode_version(
            params.pubkey_hash_addr_id,
            &script.public_key_hash()?,
        )),
        AddressType::P2wpkhNested | AddressType::P2wshNested => Ok(base58::check_encode_version(
            params.script_hash_addr_id,
            &script.script_hash()?,
        )),
        AddressType::P2wpkh | AddressType::P2wsh | AddressType::P2tr => {
            let hrp = Hrp::parse(network.bech32_hrp()?)
                .map_err(|e| ScriptError::UnsupportedNetwork(e.to_string()))?;
            let (version, program) = script
                .witness_program()
                .ok_or(ScriptError::WrongScriptType("witness program"))?;
            let version = if version == 0 { segwit::VERSION_0 } else { segwit::VERSION_1 };
            encode_witness(hrp, version, program)
        }
    }
}

fn encode_witness(hrp: Hrp, version: Fe32, program: &[u8]) -> Result<String, ScriptError> {
    segwit::encode(hrp, version, program).map_err(|e| ScriptError::InvalidAddress(e.to_string()))
}

fn to_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUB_HEX: &str = "0357bbb2d4a9cb8a2357633f201b9c518c2795ded682b7913c6beef3fe23bd6d2f";

    fn key() -> PublicKey {
        PublicKey::from_hex(PUB_HEX).unwrap()
    }

    #[test]
    fn test_testnet_vectors() {
        let pk = hex::decode(PUB_HEX).unwrap();
        let net = Network::BitcoinSignet;
        assert_eq!(encode(&pk, AddressType::P2pk, net).unwrap(), PUB_HEX);
        assert_eq!(encode(&pk, AddressType::P2pkh, net).unwrap(), "mouQtmBWDS7JnT65Grj2tPzdSmGKJgRMhE");
        assert_eq!(
            encode(&pk, AddressType::P2wpkh, net).unwrap(),
            "tb1qtsq9c4fje6qsmheql8gajwtrrdrs38kdzeersc"
        );
        assert_eq!(
            encode(&pk, AddressType::P2wpkhNested, net).unwrap(),
            "2NF33rckfiQTiE5Guk5ufUdwms8PgmtnEdc"
        );
        assert_eq!(
            encode(&pk, AddressType::P2tr, net).unwrap(),
            "tb1pklh8lqax5l7m2ycypptv2emc4gata2dy28svnwcp9u32wlkenvsspcvhsr"
        );
        assert_eq!(
            encode(&pk, AddressType::P2wsh, net).unwrap(),
            "tb1qy5042mezlj924eqplasch3zmghy2kwv9mnw94s9h9xr7hpn2hzqszdujnt"
        );
        assert_eq!(
            encode(&pk, AddressType::P2wshNested, net).unwrap(),
            "2MyEn2PfEHJ9HM7qTwYVBHWQwYtNzrCLaTT"
        );
    }

    #[test]
    fn test_mainnet_vectors() {
        let net = Network::Bitcoin;
        let addr = |t| Address::from_public_key(&key(), t, net).unwrap().address_string;
        assert_eq!(addr(AddressType::P2pkh), "19PTbi6XQQg41LcTZHkf4UnJamfcPQxraw");
        assert_eq!(addr(AddressType::P2wpkhNested), "3PUqnspe6wxN2HeN4xHnrgxWenBWxzEHRD");
        let ltc = Address::from_public_key(&key(), AddressType::P2wpkh, Network::Litecoin).unwrap();
        assert_eq!(ltc.address_string, "ltc1qtsq9c4fje6qsmheql8gajwtrrdrs38kdvrc5nm");
    }

    /// First BIP86 account key: output key a60869f0...684c.
    #[test]
    fn test_bip86_address_from_script() {
        let output = hex::decode("a60869f0dbcf1dc659c9cecbaf8050135ea9e8cdc487053f1dc6880949dc684c").unwrap();
        let script = Script::p2tr(&to_array(&output));
        let addr = Address::from_script(&script, Network::Bitcoin).unwrap();
        assert_eq!(
            addr.address_string,
            "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr"
        );
        assert_eq!(addr.address_type, AddressType::P2tr);
    }

    #[test]
    fn test_decode_types() {
        let net = Network::BitcoinTestnet3;
        let cases = [
            ("mouQtmBWDS7JnT65Grj2tPzdSmGKJgRMhE", AddressType::P2pkh),
            ("tb1qtsq9c4fje6qsmheql8gajwtrrdrs38kdzeersc", AddressType::P2wpkh),
            ("2NF33rckfiQTiE5Guk5ufUdwms8PgmtnEdc", AddressType::P2wpkhNested),
            ("tb1pklh8lqax5l7m2ycypptv2emc4gata2dy28svnwcp9u32wlkenvsspcvhsr", AddressType::P2tr),
            ("tb1qy5042mezlj924eqplasch3zmghy2kwv9mnw94s9h9xr7hpn2hzqszdujnt", AddressType::P2wsh),
            (PUB_HEX, AddressType::P2pk),
        ];
        for (addr, expected) in cases {
            let (script, t) = decode(addr, net).unwrap();
            assert_eq!(t, expected, "{}", addr);
            assert_eq!(classify(&script).unwrap(), expected);
            assert_eq!(Address::from_script(&script, net).unwrap().address_string, addr);
        }
    }

    #[test]
    fn test_decode_uppercase_bech32() {
        let upper = "TB1QTSQ9C4FJE6QSMHEQL8GAJWTRRDRS38KDZEERSC";
        let (_, t) = decode(upper, Network::BitcoinTestnet3).unwrap();
        assert_eq!(t, AddressType::P2wpkh);
    }

    #[test]
    fn test_decode_wrong_network() {
        assert!(matches!(
            decode("mouQtmBWDS7JnT65Grj2tPzdSmGKJgRMhE", Network::Bitcoin),
            Err(ScriptError::NetworkMismatch { .. })
        ));
        assert!(matches!(
            decode("tb1qtsq9c4fje6qsmheql8gajwtrrdrs38kdzeersc", Network::Bitcoin),
            Err(ScriptError::NetworkMismatch { .. })
        ));
        assert!(matches!(
            decode("not-an-address", Network::Bitcoin),
            Err(ScriptError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_segwit_rejected_without_hrp() {
        for t in [AddressType::P2wpkh, AddressType::P2wpkhNested, AddressType::P2tr, AddressType::P2wsh] {
            assert!(matches!(
                Address::from_public_key(&key(), t, Network::BitcoinCash),
                Err(ScriptError::UnsupportedNetwork(_))
            ));
        }
        assert!(Address::from_public_key(&key(), AddressType::P2pkh, Network::BitcoinCash).is_ok());
    }

    #[test]
    fn test_classify_rejects_unsupported() {
        let multisig = Script::from_hex("5201110122013353ae").unwrap();
        assert!(classify(&multisig).is_err());
        assert!(classify(&Script::from_bytes(&[0x6a, 0x01, 0x00])).is_err());
        // witness v2
        assert!(classify(&Script::from_hex("5202aabb").unwrap()).is_err());
    }

    #[test]
    fn test_address_type_names() {
        for t in AddressType::ALL {
            assert_eq!(t.as_str().parse::<AddressType>().unwrap(), t);
        }
        assert_eq!("p2wpkh-nested".parse::<AddressType>().unwrap(), AddressType::P2wpkhNested);
        assert_eq!("taproot".parse::<AddressType>().unwrap(), AddressType::P2tr);
        assert!("p2ms".parse::<AddressType>().is_err());
        assert_eq!(serde_json::to_string(&AddressType::P2tr).unwrap(), r#""P2TR""#);
    }

    #[test]
    fn test_script_len_matches_builders() {
        let net = Network::BitcoinTestnet3;
        for t in AddressType::ALL {
            let addr = Address::from_public_key(&key(), t, net).unwrap();
            assert_eq!(addr.script.len(), t.script_len(), "{}", t);
        }
    }
}
