//! Cryptographic primitives for the transaction builder.
//!
//! - Hash functions (SHA-256, SHA-256d, RIPEMD-160, Hash160, BIP340 tagged hash)
//! - Chain hash type for transaction ids
//! - Compact-size integers and byte cursors for wire encoding
//! - Base58 / Base58Check
//! - secp256k1 keys and ECDSA signatures
//! - BIP340 Schnorr signatures and the taproot key tweak

pub mod base58;
pub mod chainhash;
pub mod ec;
pub mod hash;
pub mod schnorr;
pub mod util;

mod error;
pub use error::PrimitivesError;
