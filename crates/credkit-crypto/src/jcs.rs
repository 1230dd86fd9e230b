// JCS (JSON Canonicalization Scheme) - RFC 8785 implementation

use serde::Serialize;

use crate::error::Result;

/// Canonicalizes a serializable value according to RFC 8785 (JCS) and returns the UTF-8 bytes.
///
/// This ensures deterministic JSON serialization for signing and hashing:
/// - Object keys are sorted lexicographically
/// - No unnecessary whitespace
/// - Numbers are serialized consistently
///
/// # Arguments
/// * `value` - Any serializable value
///
/// # Returns
/// * `Ok(Vec<u8>)` - UTF-8 bytes of the canonical JSON
/// * `Err` - If serialization fails
pub fn jcs_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(jcs_canonical_string(value)?.into_bytes())
}

/// Same as [`jcs_canonical_bytes`] but keeps the result as a `String`.
pub fn jcs_canonical_string<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_jcs::to_string(value)?)
}

/// Parses a JSON document and re-serializes it in canonical form.
pub fn canonicalize_json_str(input: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(input)?;
    jcs_canonical_string(&value)
}
