// Base64 / base64url helpers shared by the cipher, JWS and commitment modules

use base64::engine::general_purpose::{STANDARD as BASE64_STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

use crate::error::{CryptoError, Result};

/// Encodes bytes as unpadded base64url.
pub fn base64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes base64url, tolerating trailing `=` padding.
pub fn base64url_decode(input: &str) -> Result<Vec<u8>> {
    Ok(URL_SAFE_NO_PAD.decode(input.trim_end_matches('='))?)
}

/// Returns true if `input` is non-empty and uses only the base64url alphabet (no padding).
pub fn is_base64url(input: &str) -> bool {
    !input.is_empty()
        && input
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Decodes base64url, rejecting anything outside `[A-Za-z0-9_-]`.
pub fn base64url_decode_strict(input: &str) -> Result<Vec<u8>> {
    if !is_base64url(input) {
        return Err(CryptoError::InvalidEncoding(format!(
            "'{}' is not a base64url string",
            input
        )));
    }
    base64url_decode(input)
}

/// Encodes bytes as padded standard base64.
pub fn base64_encode(bytes: &[u8]) -> String {
    BASE64_STANDARD.encode(bytes)
}

/// Decodes padded standard base64, ignoring surrounding whitespace.
pub fn base64_decode(input: &str) -> Result<Vec<u8>> {
    Ok(BASE64_STANDARD.decode(input.trim())?)
}
