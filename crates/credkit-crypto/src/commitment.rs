// Multihash commitments for DID creation payloads
//
// A commitment is base64url(multihash(SHA-256(SHA-256(JCS(content))))).
// The verification functions fail closed: any decode error is `false`.

use multihash::Multihash;
use serde::Serialize;
use tracing::debug;

use crate::encoding::{base64url_decode_strict, base64url_encode};
use crate::error::{CryptoError, Result};
use crate::hash::sha256;
use crate::jcs::jcs_canonical_bytes;

/// Multicodec code of SHA2-256, the only accepted algorithm.
pub const SHA2_256: u64 = 0x12;

/// Digest storage large enough for any algorithm we might decode.
const MAX_DIGEST_SIZE: usize = 64;

/// The parts of a decoded multihash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMultihash {
    pub algorithm: u64,
    pub digest: Vec<u8>,
}

/// Plain SHA-256 of `content`, without the multihash prefix.
pub fn hash_as_non_multihash(content: &[u8]) -> [u8; 32] {
    sha256(content)
}

/// SHA-256 of `content` wrapped as a multihash (`0x12 0x20 || digest`).
pub fn hash(content: &[u8]) -> Result<Vec<u8>> {
    let digest = sha256(content);
    let multihash = Multihash::<MAX_DIGEST_SIZE>::wrap(SHA2_256, &digest)
        .map_err(|e| CryptoError::UnsupportedMultihash(e.to_string()))?;
    Ok(multihash.to_bytes())
}

/// base64url of [`hash`].
pub fn hash_then_encode(content: &[u8]) -> Result<String> {
    Ok(base64url_encode(&hash(content)?))
}

/// Commitment over a JSON value.
///
/// This function:
/// 1. Canonicalizes `content` with JCS
/// 2. Hashes the canonical bytes once with SHA-256
/// 3. Multihashes that intermediate digest
/// 4. Encodes the multihash as base64url
pub fn canonicalize_then_double_hash_then_encode<T: Serialize>(content: &T) -> Result<String> {
    // Step 1: Canonicalize
    let canonical = jcs_canonical_bytes(content)?;

    // Step 2: Intermediate hash
    let intermediate = hash_as_non_multihash(&canonical);

    // Step 3 and 4: Multihash and encode
    let commitment = hash_then_encode(&intermediate)?;
    debug!(commitment = %commitment, "computed commitment");
    Ok(commitment)
}

/// Splits multihash bytes into algorithm code and digest.
pub fn decode(bytes: &[u8]) -> Result<DecodedMultihash> {
    let multihash = Multihash::<MAX_DIGEST_SIZE>::from_bytes(bytes)
        .map_err(|e| CryptoError::InvalidEncoding(format!("multihash: {}", e)))?;

    Ok(DecodedMultihash {
        algorithm: multihash.code(),
        digest: multihash.digest().to_vec(),
    })
}

/// True if `bytes` is a well-formed multihash using algorithm `code`.
pub fn is_computed_using(bytes: &[u8], code: u64) -> bool {
    matches!(decode(bytes), Ok(decoded) if decoded.algorithm == code)
}

/// Requires `bytes` to be a SHA2-256 multihash.
pub fn verify_latest_algorithm(bytes: &[u8]) -> Result<()> {
    let decoded = decode(bytes)?;
    if decoded.algorithm != SHA2_256 {
        return Err(CryptoError::UnsupportedMultihash(format!(
            "algorithm 0x{:x} (expected 0x{:x})",
            decoded.algorithm, SHA2_256
        )));
    }
    Ok(())
}

/// [`verify_latest_algorithm`] on a base64url-encoded multihash.
pub fn verify_encoded_latest_algorithm(encoded: &str) -> Result<()> {
    verify_latest_algorithm(&base64url_decode_strict(encoded)?)
}

/// True if `encoded_content` is present and hashes to `encoded_multihash`.
pub fn is_valid_hash(encoded_content: Option<&str>, encoded_multihash: &str) -> bool {
    let Some(encoded_content) = encoded_content else {
        return false;
    };
    match base64url_decode_strict(encoded_content) {
        Ok(content) => verify(&content, encoded_multihash),
        Err(_) => false,
    }
}

/// True if `encoded_multihash` is the SHA2-256 multihash of `content`.
pub fn verify(content: &[u8], encoded_multihash: &str) -> bool {
    let Ok(expected) = base64url_decode_strict(encoded_multihash) else {
        return false;
    };
    if verify_latest_algorithm(&expected).is_err() {
        return false;
    }
    match hash(content) {
        Ok(actual) => actual == expected,
        Err(_) => false,
    }
}

/// True if `encoded_multihash` is the commitment of `content`.
pub fn canonicalize_and_verify_double_hash<T: Serialize>(
    content: &T,
    encoded_multihash: &str,
) -> bool {
    match jcs_canonical_bytes(content) {
        Ok(canonical) => verify(&hash_as_non_multihash(&canonical), encoded_multihash),
        Err(_) => false,
    }
}

/// Like [`canonicalize_and_verify_double_hash`] but reports a mismatch as an error.
pub fn ensure_commitment<T: Serialize>(content: &T, encoded_multihash: &str) -> Result<()> {
    if canonicalize_and_verify_double_hash(content, encoded_multihash) {
        Ok(())
    } else {
        Err(CryptoError::CommitmentMismatch)
    }
}
