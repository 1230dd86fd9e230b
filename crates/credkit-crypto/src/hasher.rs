// Keyed HMAC-SHA512 digests and request digests for credkit

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::jcs::jcs_canonical_string;
use crate::provider::{CryptoProvider, RustCrypto};

/// Canonical object hashed for a request digest.
#[derive(Debug, Serialize)]
struct RequestDigestObject<'a> {
    uri: &'a str,
    payload: Value,
}

/// HMAC-SHA512(secret, content) as lowercase hex.
pub fn digest(content: &[u8], secret: &[u8]) -> Result<String> {
    digest_with(&RustCrypto, content, secret)
}

pub fn digest_with<P: CryptoProvider + ?Sized>(
    provider: &P,
    content: &[u8],
    secret: &[u8],
) -> Result<String> {
    Ok(hex::encode(provider.hmac_sha512(secret, content)?))
}

/// Checks a hex digest against `content` in constant time.
///
/// A digest that is not valid hex is reported as an encoding error, a digest
/// that decodes but does not match returns `Ok(false)`.
pub fn verify(content: &[u8], digest_hex: &str, secret: &[u8]) -> Result<bool> {
    verify_with(&RustCrypto, content, digest_hex, secret)
}

pub fn verify_with<P: CryptoProvider + ?Sized>(
    provider: &P,
    content: &[u8],
    digest_hex: &str,
    secret: &[u8],
) -> Result<bool> {
    let expected = hex::decode(digest_hex.trim())?;
    let matches = provider.hmac_sha512_verify(secret, content, &expected)?;
    if !matches {
        warn!("HMAC digest mismatch");
    }
    Ok(matches)
}

/// Builds the canonical string `{"payload":<payload>,"uri":<uri>}` with keys
/// sorted recursively, so key order in `payload_json` does not matter.
pub fn request_digest_message(uri: &str, payload_json: &str) -> Result<String> {
    let payload: Value = serde_json::from_str(payload_json)?;
    jcs_canonical_string(&RequestDigestObject { uri, payload })
}

/// Digest a client attaches to a request for `uri` carrying `payload_json`.
///
/// This function:
/// 1. Parses the JSON body
/// 2. Canonicalizes `{uri, payload}` with JCS
/// 3. Returns HMAC-SHA512 of the canonical string as hex
pub fn generate_request_digest(uri: &str, payload_json: &str, secret: &[u8]) -> Result<String> {
    generate_request_digest_with(&RustCrypto, uri, payload_json, secret)
}

pub fn generate_request_digest_with<P: CryptoProvider + ?Sized>(
    provider: &P,
    uri: &str,
    payload_json: &str,
    secret: &[u8],
) -> Result<String> {
    let message = request_digest_message(uri, payload_json)?;
    debug!(uri, "computing request digest");
    digest_with(provider, message.as_bytes(), secret)
}

/// Receiver side of [`generate_request_digest`].
pub fn verify_request_digest(
    uri: &str,
    payload_json: &str,
    digest_hex: &str,
    secret: &[u8],
) -> Result<bool> {
    verify_request_digest_with(&RustCrypto, uri, payload_json, digest_hex, secret)
}

pub fn verify_request_digest_with<P: CryptoProvider + ?Sized>(
    provider: &P,
    uri: &str,
    payload_json: &str,
    digest_hex: &str,
    secret: &[u8],
) -> Result<bool> {
    let message = request_digest_message(uri, payload_json)?;
    verify_with(provider, message.as_bytes(), digest_hex, secret)
}
