//! Base58 and Base58Check encoding.
//!
//! Legacy key-hash and script-hash addresses are Base58Check strings: a
//! version byte, the payload, and the first four bytes of the payload's
//! double SHA-256 as a checksum.

use crate::hash::sha256d;
use crate::PrimitivesError;

/// Encode a byte slice to a Base58 string using the bitcoin alphabet.
pub fn encode(data: &[u8]) -> String {
    bs58::encode(data)
        .with_alphabet(bs58::Alphabet::BITCOIN)
        .into_string()
}

/// Decode a Base58 string to a byte vector.
///
/// # Returns
/// `Ok(Vec<u8>)` on success, or `InvalidBase58` for characters outside the alphabet.
pub fn decode(s: &str) -> Result<Vec<u8>, PrimitivesError> {
    bs58::decode(s)
        .with_alphabet(bs58::Alphabet::BITCOIN)
        .into_vec()
        .map_err(|e| PrimitivesError::InvalidBase58(e.to_string()))
}

/// Encode `data` with a 4-byte double-SHA-256 checksum appended.
pub fn check_encode(data: &[u8]) -> String {
    let checksum = sha256d(data);
    let mut payload = Vec::with_capacity(data.len() + 4);
    payload.extend_from_slice(data);
    payload.extend_from_slice(&checksum[..4]);
    encode(&payload)
}

/// Decode a Base58Check string, verifying and stripping the checksum.
///
/// # Returns
/// The payload without checksum, `ChecksumMismatch` if the checksum is
/// wrong, or `InvalidBase58` for bad encoding.
pub fn check_decode(s: &str) -> Result<Vec<u8>, PrimitivesError> {
    let decoded = decode(s)?;
    if decoded.len() < 4 {
        return Err(PrimitivesError::InvalidBase58(
            "data too short for checksum".to_string(),
        ));
    }
    let (payload, checksum) = decoded.split_at(decoded.len() - 4);
    if checksum != &sha256d(payload)[..4] {
        return Err(PrimitivesError::ChecksumMismatch);
    }
    Ok(payload.to_vec())
}

/// Base58Check-encode a version byte followed by `payload`.
///
/// # Arguments
/// * `version` - Network-specific version byte (e.g. `0x00` for mainnet key hash).
/// * `payload` - Body bytes, typically a 20-byte hash.
pub fn check_encode_version(version: u8, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + 1);
    data.push(version);
    data.extend_from_slice(payload);
    check_encode(&data)
}

/// Decode a Base58Check string into its version byte and payload.
pub fn check_decode_version(s: &str) -> Result<(u8, Vec<u8>), PrimitivesError> {
    let data = check_decode(s)?;
    match data.split_first() {
        Some((version, payload)) => Ok((*version, payload.to_vec())),
        None => Err(PrimitivesError::InvalidBase58("missing version byte".to_string())),
    }
}
