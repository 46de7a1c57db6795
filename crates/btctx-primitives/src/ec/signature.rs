//! ECDSA signature with strict DER serialization and RFC6979 nonces.
//!
//! Signatures are always produced in low-S form. Parsing follows the strict
//! DER rules enforced for transaction signatures: minimal integer encodings,
//! no negative values and no trailing bytes.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa;

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::PrimitivesError;

/// Digest length accepted by [`Signature::sign`] and [`Signature::verify`].
pub const DIGEST_LEN: usize = 32;

/// An ECDSA signature over secp256k1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    inner: ecdsa::Signature,
}

impl Signature {
    /// Build a signature from big-endian R and S values.
    ///
    /// # Returns
    /// An error if either value is zero or not below the curve order.
    pub fn from_scalars(r: [u8; 32], s: [u8; 32]) -> Result<Self, PrimitivesError> {
        let inner = ecdsa::Signature::from_scalars(k256::FieldBytes::from(r), k256::FieldBytes::from(s))
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(Signature { inner })
    }

    /// Parse a strict DER signature: `0x30 len 0x02 rlen r 0x02 slen s`.
    ///
    /// # Arguments
    /// * `bytes` - DER bytes without a trailing sighash byte.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or `InvalidSignature` naming the violated rule.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let fail = |msg: &str| PrimitivesError::InvalidSignature(format!("malformed signature: {}", msg));

        if bytes.len() < 8 || bytes.len() > 72 {
            return Err(fail("bad length"));
        }
        if bytes[0] != 0x30 {
            return Err(fail("no header magic"));
        }
        if bytes[1] as usize != bytes.len() - 2 {
            return Err(fail("length does not match data"));
        }

        let (r, rest) = parse_der_int(&bytes[2..]).map_err(|m| fail(&format!("R {}", m)))?;
        let (s, rest) = parse_der_int(rest).map_err(|m| fail(&format!("S {}", m)))?;
        if !rest.is_empty() {
            return Err(fail("trailing bytes"));
        }
        Self::from_scalars(r, s)
    }

    /// Serialize as strict DER.
    pub fn to_der(&self) -> Vec<u8> {
        let rb = canonical_int(&self.r());
        let sb = canonical_int(&self.s());
        let body_len = 4 + rb.len() + sb.len();
        let mut out = Vec::with_capacity(body_len + 2);
        out.push(0x30);
        out.push(body_len as u8);
        out.push(0x02);
        out.push(rb.len() as u8);
        out.extend_from_slice(&rb);
        out.push(0x02);
        out.push(sb.len() as u8);
        out.extend_from_slice(&sb);
        out
    }

    /// Big-endian R value.
    pub fn r(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.inner.r().to_bytes());
        out
    }

    /// Big-endian S value.
    pub fn s(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.inner.s().to_bytes());
        out
    }

    /// Whether S is in the lower half of the curve order.
    pub fn is_low_s(&self) -> bool {
        self.inner.normalize_s().is_none()
    }

    /// Sign a 32-byte digest with RFC6979 deterministic nonces.
    ///
    /// # Arguments
    /// * `digest` - The 32-byte message digest.
    /// * `priv_key` - The private key to sign with.
    ///
    /// # Returns
    /// A low-S signature, or an error if the digest is not 32 bytes.
    pub fn sign(digest: &[u8], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        if digest.len() != DIGEST_LEN {
            return Err(PrimitivesError::InvalidHash(format!(
                "digest must be {} bytes, got {}",
                DIGEST_LEN,
                digest.len()
            )));
        }
        let (sig, _recovery_id) = priv_key
            .signing_key()
            .sign_prehash_recoverable(digest)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        let inner = sig.normalize_s().unwrap_or(sig);
        Ok(Signature { inner })
    }

    /// Verify this signature against a 32-byte digest and public key.
    ///
    /// High-S signatures are normalized before checking.
    pub fn verify(&self, digest: &[u8], pub_key: &PublicKey) -> bool {
        if digest.len() != DIGEST_LEN {
            return false;
        }
        let sig = self.inner.normalize_s().unwrap_or(self.inner);
        pub_key.verifying_key().verify_prehash(digest, &sig).is_ok()
    }
}

/// Parse one DER INTEGER, returning it left-padded to 32 bytes plus the rest.
fn parse_der_int(data: &[u8]) -> Result<([u8; 32], &[u8]), &'static str> {
    if data.len() < 2 || data[0] != 0x02 {
        return Err("missing integer marker");
    }
    let len = data[1] as usize;
    if len == 0 {
        return Err("zero length");
    }
    if data.len() < 2 + len {
        return Err("length exceeds data");
    }
    let value = &data[2..2 + len];
    if value[0] & 0x80 != 0 {
        return Err("is negative");
    }
    if len > 1 && value[0] == 0x00 && value[1] & 0x80 == 0 {
        return Err("has excess padding");
    }
    let trimmed = if value[0] == 0x00 { &value[1..] } else { value };
    if trimmed.len() > 32 {
        return Err("too large");
    }
    let mut out = [0u8; 32];
    out[32 - trimmed.len()..].copy_from_slice(trimmed);
    Ok((out, &data[2 + len..]))
}

/// Minimal big-endian encoding of a non-negative integer for DER.
fn canonical_int(val: &[u8; 32]) -> Vec<u8> {
    let start = val.iter().position(|b| *b != 0).unwrap_or(31);
    let trimmed = &val[start..];
    let mut out = Vec::with_capacity(trimmed.len() + 1);
    if trimmed[0] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
    out
}
