//! secp256k1 public key.
//!
//! Remembers whether it was parsed from a compressed or uncompressed SEC1
//! encoding, since pay-to-pubkey scripts and key hashes commit to the exact
//! serialized form.

use std::fmt;

use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::ProjectivePoint;

use crate::ec::signature::Signature;
use crate::hash::hash160;
use crate::PrimitivesError;

/// Length of a compressed public key in bytes.
pub const COMPRESSED_LEN: usize = 33;

/// Length of an uncompressed public key in bytes.
pub const UNCOMPRESSED_LEN: usize = 65;

/// A secp256k1 public key.
#[derive(Clone, Debug)]
pub struct PublicKey {
    inner: VerifyingKey,
    compressed: bool,
}

impl PublicKey {
    /// Parse a SEC1-encoded public key (33 or 65 bytes).
    ///
    /// # Arguments
    /// * `bytes` - Compressed or uncompressed SEC1 bytes.
    ///
    /// # Returns
    /// `Ok(PublicKey)` on success, or `InvalidPublicKey` if the bytes are not
    /// a point on the curve.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let compressed = match bytes.len() {
            COMPRESSED_LEN => true,
            UNCOMPRESSED_LEN => false,
            n => {
                return Err(PrimitivesError::InvalidPublicKey(format!(
                    "invalid public key length {}",
                    n
                )))
            }
        };
        let inner = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| PrimitivesError::InvalidPublicKey(e.to_string()))?;
        Ok(PublicKey { inner, compressed })
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Serialize in compressed SEC1 format (33 bytes).
    pub fn to_compressed(&self) -> [u8; COMPRESSED_LEN] {
        let point = self.inner.to_encoded_point(true);
        let mut out = [0u8; COMPRESSED_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Serialize in uncompressed SEC1 format (65 bytes).
    pub fn to_uncompressed(&self) -> [u8; UNCOMPRESSED_LEN] {
        let point = self.inner.to_encoded_point(false);
        let mut out = [0u8; UNCOMPRESSED_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Serialize in the form the key was parsed from.
    pub fn serialize(&self) -> Vec<u8> {
        if self.compressed {
            self.to_compressed().to_vec()
        } else {
            self.to_uncompressed().to_vec()
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// The 32-byte x coordinate, as used by BIP340.
    pub fn x_only(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.to_compressed()[1..]);
        out
    }

    /// Whether the point's y coordinate is odd.
    pub fn has_odd_y(&self) -> bool {
        self.to_compressed()[0] == 0x03
    }

    /// Hex of the serialized form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Hash160 of the serialized form.
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.serialize())
    }

    /// Verify an ECDSA signature over a 32-byte digest.
    pub fn verify(&self, digest: &[u8], sig: &Signature) -> bool {
        sig.verify(digest, self)
    }

    pub(crate) fn from_k256_verifying_key(vk: &VerifyingKey) -> Self {
        PublicKey {
            inner: *vk,
            compressed: true,
        }
    }

    pub(crate) fn to_projective_point(&self) -> ProjectivePoint {
        ProjectivePoint::from(*self.inner.as_affine())
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.inner
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for PublicKey {}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUB_HEX: &str = "0357bbb2d4a9cb8a2357633f201b9c518c2795ded682b7913c6beef3fe23bd6d2f";

    #[test]
    fn test_compressed_roundtrip_and_parity() {
        let key = PublicKey::from_hex(PUB_HEX).unwrap();
        assert!(key.is_compressed());
        assert!(key.has_odd_y());
        assert_eq!(key.to_hex(), PUB_HEX);
        assert_eq!(hex::encode(key.x_only()), &PUB_HEX[2..]);
        assert_eq!(
            hex::encode(key.hash160()),
            "5c005c5532ce810ddf20f9d1d939631b47089ecd"
        );
    }

    #[test]
    fn test_uncompressed_keeps_form() {
        let key = PublicKey::from_hex(PUB_HEX).unwrap();
        let uncompressed = PublicKey::from_bytes(&key.to_uncompressed()).unwrap();
        assert!(!uncompressed.is_compressed());
        assert_eq!(uncompressed.serialize().len(), UNCOMPRESSED_LEN);
        assert_eq!(uncompressed, key, "same point regardless of encoding");
        assert_ne!(uncompressed.hash160(), key.hash160());
    }

    #[test]
    fn test_invalid_keys() {
        assert!(PublicKey::from_bytes(&[]).is_err());
        assert!(PublicKey::from_bytes(&[0x02; 32]).is_err());
        // x coordinate not on the curve
        let mut bad = [0u8; 33];
        bad[0] = 0x02;
        bad[32] = 0x05;
        assert!(PublicKey::from_bytes(&bad).is_err());
    }
}
