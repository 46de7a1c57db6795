//! secp256k1 private key.
//!
//! Wraps the k256 signing key and adds hex and WIF encodings. The scalar is
//! exposed inside the crate so the taproot tweak in [`crate::schnorr`] can
//! work on it directly.

use std::fmt;

use k256::ecdsa::SigningKey;
use k256::Scalar;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::base58;
use crate::ec::public_key::PublicKey;
use crate::ec::signature::Signature;
use crate::PrimitivesError;

/// Length of a serialized private key in bytes.
const PRIVATE_KEY_BYTES_LEN: usize = 32;

/// Mainnet WIF prefix byte.
pub const MAINNET_WIF_PREFIX: u8 = 0x80;

/// Testnet, signet and regtest WIF prefix byte.
pub const TESTNET_WIF_PREFIX: u8 = 0xef;

/// Compression flag appended to the WIF payload for compressed public keys.
const COMPRESS_MAGIC: u8 = 0x01;

/// A secp256k1 private key.
#[derive(Clone)]
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a new random private key using the OS random number generator.
    pub fn new() -> Self {
        PrivateKey {
            inner: SigningKey::random(&mut OsRng),
        }
    }

    /// Create a private key from a raw 32-byte scalar.
    ///
    /// # Arguments
    /// * `bytes` - A 32-byte big-endian scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` if the scalar is in `[1, n)`, an error otherwise.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != PRIVATE_KEY_BYTES_LEN {
            return Err(PrimitivesError::InvalidKeyLength {
                expected: PRIVATE_KEY_BYTES_LEN,
                got: bytes.len(),
            });
        }
        let inner = SigningKey::from_slice(bytes)
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey { inner })
    }

    /// Create a private key from a 64-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "private key hex is empty".to_string(),
            ));
        }
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Decode a WIF string into the key and its network prefix byte.
    ///
    /// Both compressed (34-byte payload) and uncompressed (33-byte payload)
    /// forms are accepted.
    ///
    /// # Returns
    /// `(PrivateKey, prefix)` on success, or an error for a malformed
    /// payload or checksum mismatch.
    pub fn from_wif(wif: &str) -> Result<(Self, u8), PrimitivesError> {
        let payload = base58::check_decode(wif)?;
        let key_bytes = match payload.len() {
            34 if payload[33] == COMPRESS_MAGIC => &payload[1..33],
            34 => {
                return Err(PrimitivesError::InvalidWif(
                    "invalid compression flag".to_string(),
                ))
            }
            33 => &payload[1..33],
            n => {
                return Err(PrimitivesError::InvalidWif(format!(
                    "invalid payload length {}",
                    n
                )))
            }
        };
        Ok((Self::from_bytes(key_bytes)?, payload[0]))
    }

    /// Encode the key as a compressed-pubkey WIF string with the given prefix.
    ///
    /// # Arguments
    /// * `prefix` - Network prefix byte (`0x80` mainnet, `0xef` test networks).
    pub fn to_wif(&self, prefix: u8) -> String {
        let mut payload = Vec::with_capacity(PRIVATE_KEY_BYTES_LEN + 2);
        payload.push(prefix);
        payload.extend_from_slice(&self.to_bytes());
        payload.push(COMPRESS_MAGIC);
        let wif = base58::check_encode(&payload);
        payload.zeroize();
        wif
    }

    /// Serialize the private key as a 32-byte big-endian array.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.inner.to_bytes());
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Derive the compressed public key for this private key.
    pub fn pub_key(&self) -> PublicKey {
        PublicKey::from_k256_verifying_key(self.inner.verifying_key())
    }

    /// Sign a 32-byte digest with RFC6979 nonces, producing a low-S signature.
    pub fn sign(&self, digest: &[u8]) -> Result<Signature, PrimitivesError> {
        Signature::sign(digest, self)
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }

    pub(crate) fn to_scalar(&self) -> Scalar {
        *self.inner.as_nonzero_scalar().as_ref()
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("pub_key", &self.pub_key().to_hex())
            .finish_non_exhaustive()
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for PrivateKey {}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HEX: &str = "1790962db820729606cd7b255ace1ac5ebb129ac8e9b2d8534d022194ab25b37";

    #[test]
    fn test_pub_key_derivation() {
        let key = PrivateKey::from_hex(KEY_HEX).unwrap();
        assert_eq!(
            key.pub_key().to_hex(),
            "031053e9ef0295d334b6bb22e20cc717eb1a16a546f692572c8830b4bc14c13676"
        );
    }

    #[test]
    fn test_serialization_roundtrips() {
        let key = PrivateKey::new();
        assert_eq!(PrivateKey::from_bytes(&key.to_bytes()).unwrap(), key);
        assert_eq!(PrivateKey::from_hex(&key.to_hex()).unwrap(), key);

        let wif = key.to_wif(TESTNET_WIF_PREFIX);
        let (decoded, prefix) = PrivateKey::from_wif(&wif).unwrap();
        assert_eq!(decoded, key);
        assert_eq!(prefix, TESTNET_WIF_PREFIX);
    }

    #[test]
    fn test_known_mainnet_wif() {
        // Scalar 1, compressed, mainnet.
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        let key = PrivateKey::from_bytes(&bytes).unwrap();
        assert_eq!(
            key.to_wif(MAINNET_WIF_PREFIX),
            "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn"
        );
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(PrivateKey::from_hex("").is_err());
        assert!(PrivateKey::from_bytes(&[0u8; 32]).is_err(), "zero scalar");
        assert!(PrivateKey::from_bytes(&[1u8; 31]).is_err());
        assert!(PrivateKey::from_wif("KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWo").is_err());
    }

    #[test]
    fn test_debug_does_not_print_scalar() {
        let key = PrivateKey::from_hex(KEY_HEX).unwrap();
        let debug = format!("{:?}", key);
        assert!(!debug.contains(KEY_HEX));
    }
}
