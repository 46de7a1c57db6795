//! Signing capabilities.
//!
//! The signing engine never sees key material. It hands a 32-byte digest to
//! a [`Signer`] and gets back a signature: DER-encoded ECDSA for legacy and
//! segwit v0 inputs, 64-byte BIP340 for taproot inputs. Hardware or remote
//! signers implement the trait, or are passed as closures.

use btctx_primitives::ec::{PrivateKey, PublicKey};
use btctx_primitives::schnorr;

use crate::error::BoxError;

/// Error type returned by signing capabilities.
pub type SignerError = BoxError;

/// Produces a signature over a digest.
pub trait Signer {
    /// Sign `digest`.
    ///
    /// # Returns
    /// The raw signature bytes, without a hash type suffix.
    fn sign(&self, digest: &[u8; 32]) -> Result<Vec<u8>, SignerError>;
}

impl<F> Signer for F
where
    F: Fn(&[u8; 32]) -> Result<Vec<u8>, SignerError>,
{
    fn sign(&self, digest: &[u8; 32]) -> Result<Vec<u8>, SignerError> {
        self(digest)
    }
}

/// ECDSA signer holding a private key. Signatures are low-S DER.
pub struct EcdsaKeySigner {
    key: PrivateKey,
}

impl EcdsaKeySigner {
    pub fn new(key: PrivateKey) -> Self {
        EcdsaKeySigner { key }
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.pub_key()
    }
}

impl Signer for EcdsaKeySigner {
    fn sign(&self, digest: &[u8; 32]) -> Result<Vec<u8>, SignerError> {
        Ok(self.key.sign(digest)?.to_der())
    }
}

/// BIP340 signer for taproot key-path spends.
///
/// Holds the key tweaked for a key-path-only output, so its signatures
/// verify against the output key of [`Script::p2tr`](btctx_script::Script::p2tr)
/// addresses built from the untweaked public key.
pub struct SchnorrKeySigner {
    tweaked: PrivateKey,
    internal: PublicKey,
}

impl SchnorrKeySigner {
    /// Tweak `key` for a key-path-only output.
    ///
    /// # Returns
    /// The signer, or an error if the tweak is out of range.
    pub fn new(key: &PrivateKey) -> Result<Self, SignerError> {
        Ok(SchnorrKeySigner {
            tweaked: schnorr::tweak_private_key(key, None)?,
            internal: key.pub_key(),
        })
    }

    /// The untweaked public key the taproot address commits to.
    pub fn internal_key(&self) -> PublicKey {
        self.internal.clone()
    }
}

impl Signer for SchnorrKeySigner {
    fn sign(&self, digest: &[u8; 32]) -> Result<Vec<u8>, SignerError> {
        Ok(schnorr::sign(&self.tweaked, digest)?.to_vec())
    }
}
