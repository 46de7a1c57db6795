//! Chain hash type for transaction identification.
//!
//! A `Hash` is a 32-byte array stored in internal (wire) order and
//! displayed as byte-reversed hex, the convention block explorers and
//! RPC interfaces use for transaction ids.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hash::{sha256, sha256d};
use crate::PrimitivesError;

/// Size of a Hash in bytes.
pub const HASH_SIZE: usize = 32;

/// A 32-byte hash used for transaction ids and outpoints.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Create a Hash from a raw 32-byte array in internal byte order.
    pub fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Create a Hash from a byte slice in internal byte order.
    ///
    /// # Arguments
    /// * `bytes` - A slice that must be exactly 32 bytes.
    ///
    /// # Returns
    /// `Ok(Hash)` if the slice is 32 bytes, or an error otherwise.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let arr: [u8; HASH_SIZE] = bytes.try_into().map_err(|_| {
            PrimitivesError::InvalidHash(format!(
                "invalid hash length of {}, want {}",
                bytes.len(),
                HASH_SIZE
            ))
        })?;
        Ok(Hash(arr))
    }

    /// Parse a display-order (byte-reversed) hex string.
    ///
    /// The string must encode exactly 32 bytes; transaction ids are never
    /// abbreviated.
    ///
    /// # Arguments
    /// * `hex_str` - A 64-character hex string.
    ///
    /// # Returns
    /// `Ok(Hash)` on success, or an error for invalid hex or length.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.len() != HASH_SIZE * 2 {
            return Err(PrimitivesError::InvalidHash(format!(
                "hash string must be {} hex characters, got {}",
                HASH_SIZE * 2,
                hex_str.len()
            )));
        }
        let mut bytes = hex::decode(hex_str)?;
        bytes.reverse();
        Hash::from_bytes(&bytes)
    }

    /// Access the internal byte array.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Consume the hash, returning the internal byte array.
    pub fn to_bytes(self) -> [u8; HASH_SIZE] {
        self.0
    }
}

/// Display the hash as byte-reversed hex.
impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        write!(f, "{}", hex::encode(reversed))
    }
}

impl FromStr for Hash {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_hex(s)
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// SHA-256 of `data` as a Hash.
pub fn hash_h(data: &[u8]) -> Hash {
    Hash(sha256(data))
}

/// Double SHA-256 of `data` as a Hash.
pub fn double_hash_h(data: &[u8]) -> Hash {
    Hash(sha256d(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TXID: &str = "0b2c23f5c2e6326c90cfa1d3925b0d83f4b08035ca6af8fd8f606385dfbc5822";

    #[test]
    fn test_from_hex_reverses_into_wire_order() {
        let hash = Hash::from_hex(TXID).unwrap();
        assert_eq!(hash.as_bytes()[0], 0x22);
        assert_eq!(hash.as_bytes()[31], 0x0b);
        assert_eq!(hash.to_string(), TXID);
    }

    #[test]
    fn test_from_hex_rejects_short_and_invalid() {
        assert!(Hash::from_hex("abcd").is_err());
        let bad = "zz".repeat(32);
        assert!(Hash::from_hex(&bad).is_err());
    }

    #[test]
    fn test_from_bytes_length() {
        assert!(Hash::from_bytes(&[0u8; 31]).is_err());
        assert_eq!(Hash::from_bytes(&[7u8; 32]).unwrap(), Hash::new([7u8; 32]));
    }

    #[test]
    fn test_serde_json_uses_display_hex() {
        let hash: Hash = TXID.parse().unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", TXID));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn test_double_hash_h_matches_sha256d() {
        assert_eq!(double_hash_h(b"abc").as_bytes(), &sha256d(b"abc"));
        assert_eq!(hash_h(b"abc").as_bytes(), &sha256(b"abc"));
    }
}
