//! BIP340 Schnorr signatures and the BIP341 taproot key tweak.
//!
//! Taproot outputs commit to an x-only output key `Q = P + t·G`, where `P`
//! is the even-y lift of the internal key and
//! `t = tagged_hash("TapTweak", x(P) || merkle_root)`. A key-path spend signs
//! with the matching tweaked secret `d' = d + t`, after negating `d` when
//! `P` has odd y.

use k256::elliptic_curve::ff::{Field, PrimeField};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::schnorr;
use k256::{FieldBytes, ProjectivePoint, Scalar};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::hash::tagged_hash;
use crate::PrimitivesError;

/// Length of a BIP340 signature.
pub const SCHNORR_SIGNATURE_LEN: usize = 64;

/// A 32-byte x-only public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct XOnlyPublicKey([u8; 32]);

impl XOnlyPublicKey {
    /// Parse 32 bytes, checking that they are the x coordinate of a curve point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| PrimitivesError::InvalidKeyLength {
            expected: 32,
            got: bytes.len(),
        })?;
        lift_x(&arr)?;
        Ok(XOnlyPublicKey(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Verify a BIP340 signature over a 32-byte message digest.
    pub fn verify(&self, digest: &[u8; 32], signature: &[u8]) -> bool {
        if signature.len() != SCHNORR_SIGNATURE_LEN {
            return false;
        }
        let Ok(vk) = schnorr::VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let Ok(sig) = schnorr::Signature::try_from(signature) else {
            return false;
        };
        vk.verify_raw(digest, &sig).is_ok()
    }
}

impl From<&PublicKey> for XOnlyPublicKey {
    fn from(key: &PublicKey) -> Self {
        XOnlyPublicKey(key.x_only())
    }
}

/// Compute the taproot tweak `tagged_hash("TapTweak", x || merkle_root)`.
///
/// # Arguments
/// * `internal` - x-only internal key.
/// * `merkle_root` - Script tree root, or `None` for key-path-only outputs.
pub fn tap_tweak_hash(internal: &XOnlyPublicKey, merkle_root: Option<&[u8; 32]>) -> [u8; 32] {
    match merkle_root {
        Some(root) => tagged_hash("TapTweak", &[internal.as_bytes(), root]),
        None => tagged_hash("TapTweak", &[internal.as_bytes()]),
    }
}

/// Derive the taproot output key for an internal key.
///
/// # Returns
/// The x-only output key and whether its y coordinate is odd, or
/// `InvalidTweak` if the tweak is out of range or yields the point at infinity.
pub fn tweak_public_key(
    internal: &XOnlyPublicKey,
    merkle_root: Option<&[u8; 32]>,
) -> Result<(XOnlyPublicKey, bool), PrimitivesError> {
    let p = lift_x(internal.as_bytes())?;
    let t = tweak_scalar(internal, merkle_root)?;
    let q = p + ProjectivePoint::GENERATOR * t;
    if q == ProjectivePoint::IDENTITY {
        return Err(PrimitivesError::InvalidTweak("tweaked key is infinity".to_string()));
    }
    let encoded = q.to_affine().to_encoded_point(true);
    let bytes = encoded.as_bytes();
    let mut x = [0u8; 32];
    x.copy_from_slice(&bytes[1..33]);
    Ok((XOnlyPublicKey(x), bytes[0] == 0x03))
}

/// Derive the secret key matching [`tweak_public_key`] for `key`'s public key.
pub fn tweak_private_key(
    key: &PrivateKey,
    merkle_root: Option<&[u8; 32]>,
) -> Result<PrivateKey, PrimitivesError> {
    let pub_key = key.pub_key();
    let internal = XOnlyPublicKey::from(&pub_key);
    let d = if pub_key.has_odd_y() {
        -key.to_scalar()
    } else {
        key.to_scalar()
    };
    let tweaked = d + tweak_scalar(&internal, merkle_root)?;
    if bool::from(tweaked.is_zero()) {
        return Err(PrimitivesError::InvalidTweak("tweaked secret is zero".to_string()));
    }
    PrivateKey::from_bytes(&tweaked.to_bytes())
}

/// Produce a BIP340 signature over a 32-byte digest with fresh auxiliary randomness.
pub fn sign(key: &PrivateKey, digest: &[u8; 32]) -> Result<[u8; SCHNORR_SIGNATURE_LEN], PrimitivesError> {
    let mut aux = [0u8; 32];
    OsRng.fill_bytes(&mut aux);
    sign_with_aux(key, digest, &aux)
}

/// Produce a BIP340 signature with caller-supplied auxiliary randomness.
pub fn sign_with_aux(
    key: &PrivateKey,
    digest: &[u8; 32],
    aux: &[u8; 32],
) -> Result<[u8; SCHNORR_SIGNATURE_LEN], PrimitivesError> {
    let signing_key = schnorr::SigningKey::from_bytes(&key.to_bytes())
        .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
    let sig = signing_key
        .sign_raw(digest, aux)
        .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
    Ok(sig.to_bytes())
}

/// Lift an x coordinate to the curve point with even y.
fn lift_x(x: &[u8; 32]) -> Result<ProjectivePoint, PrimitivesError> {
    let mut compressed = [0u8; 33];
    compressed[0] = 0x02;
    compressed[1..].copy_from_slice(x);
    let key = PublicKey::from_bytes(&compressed)
        .map_err(|_| PrimitivesError::PointNotOnCurve)?;
    Ok(key.to_projective_point())
}

fn tweak_scalar(
    internal: &XOnlyPublicKey,
    merkle_root: Option<&[u8; 32]>,
) -> Result<Scalar, PrimitivesError> {
    let t = tap_tweak_hash(internal, merkle_root);
    Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(t)))
        .ok_or_else(|| PrimitivesError::InvalidTweak("tweak exceeds curve order".to_string()))
}
