// Detached JWS (RFC 7515 + RFC 7797 unencoded payload) for credkit
//
// Only one profile is accepted: alg ES256K, b64 false, crit ["b64"], empty
// payload segment. Verifiers rebuild the payload from the object they hold.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::encoding::{base64url_decode, base64url_encode};
use crate::error::{CryptoError, Result};
use crate::jcs::jcs_canonical_bytes;
use crate::keys::KeyPair;
use crate::provider::{CryptoProvider, RustCrypto};
use crate::signer;

/// The only accepted `alg`.
pub const ALGORITHM: &str = "ES256K";

/// Protected header of a detached JWS.
///
/// Field order matters: it serializes to exactly
/// `{"alg":"ES256K","b64":false,"crit":["b64"]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwsHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64: Option<bool>,
    #[serde(default)]
    pub crit: Vec<String>,
}

impl JwsHeader {
    /// The fixed ES256K detached-payload header.
    pub fn detached_es256k() -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            b64: Some(false),
            crit: vec!["b64".to_string()],
        }
    }

    /// Rejects any header outside the single supported profile.
    pub fn check_profile(&self) -> Result<()> {
        if self.alg != ALGORITHM {
            return Err(CryptoError::UnsupportedAlgorithm(self.alg.clone()));
        }
        if self.b64 != Some(false) {
            return Err(CryptoError::ProfileViolation(
                "header 'b64' must be false".to_string(),
            ));
        }
        if !self.crit.iter().any(|c| c == "b64") {
            return Err(CryptoError::ProfileViolation(
                "header 'crit' must contain \"b64\"".to_string(),
            ));
        }
        Ok(())
    }
}

/// Produces `header..signature` for `object`.
///
/// This function:
/// 1. Serializes and base64url-encodes the fixed header
/// 2. Base64url-encodes the JCS form of `object` as the payload
/// 3. Signs the ASCII signing input `header.payload`
/// 4. Emits the compact form with the payload segment left empty
pub fn encode<T: Serialize>(object: &T, key: &KeyPair) -> Result<String> {
    encode_with(&RustCrypto, object, key)
}

pub fn encode_with<P: CryptoProvider + ?Sized, T: Serialize>(
    provider: &P,
    object: &T,
    key: &KeyPair,
) -> Result<String> {
    // Step 1: Header
    let header = serde_json::to_vec(&JwsHeader::detached_es256k())?;
    let header_segment = base64url_encode(&header);

    // Step 2: Payload (used only for the signing input)
    let input = signing_input(&header_segment, object)?;

    // Step 3: Sign
    let signature = signer::sign_with(provider, input.as_bytes(), key)?;

    // Step 4: Detached compact serialization
    let jws = format!("{}..{}", header_segment, base64url_encode(&signature));
    debug!(jws_len = jws.len(), "encoded detached JWS");
    Ok(jws)
}

/// Decodes and parses the first segment of a compact JWS.
pub fn decode_header(segment: &str) -> Result<JwsHeader> {
    let bytes = base64url_decode(segment)
        .map_err(|e| CryptoError::MalformedJws(format!("header is not base64url: {}", e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CryptoError::MalformedJws(format!("header is not valid JSON: {}", e)))
}

/// Verifies a detached JWS against the object it was computed over.
///
/// # Returns
/// * `Ok(true)` / `Ok(false)` for a well-formed JWS with a matching / non-matching signature
/// * `MalformedJws` unless there are exactly three segments with a decodable header and signature
/// * `UnsupportedAlgorithm` if `alg` is not ES256K
/// * `ProfileViolation` if `b64` is not false or `crit` lacks "b64"
/// * `UnexpectedPayload` if the middle segment is not empty
pub fn verify<T: Serialize>(object: &T, jws: &str, key: &KeyPair) -> Result<bool> {
    verify_with(&RustCrypto, object, jws, key)
}

pub fn verify_with<P: CryptoProvider + ?Sized, T: Serialize>(
    provider: &P,
    object: &T,
    jws: &str,
    key: &KeyPair,
) -> Result<bool> {
    let segments: Vec<&str> = jws.split('.').collect();
    if segments.len() != 3 {
        return Err(CryptoError::MalformedJws(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }
    let (header_segment, payload_segment, signature_segment) =
        (segments[0], segments[1], segments[2]);

    let header = decode_header(header_segment)?;
    if let Err(e) = header.check_profile() {
        warn!(error = %e, "rejected JWS header");
        return Err(e);
    }

    if !payload_segment.is_empty() {
        warn!("rejected JWS with attached payload");
        return Err(CryptoError::UnexpectedPayload);
    }

    let signature = base64url_decode(signature_segment)
        .map_err(|e| CryptoError::MalformedJws(format!("signature is not base64url: {}", e)))?;

    let input = signing_input(header_segment, object)?;
    signer::verify_with(provider, input.as_bytes(), &signature, key)
}

fn signing_input<T: Serialize>(header_segment: &str, object: &T) -> Result<String> {
    let payload = jcs_canonical_bytes(object)?;
    Ok(format!("{}.{}", header_segment, base64url_encode(&payload)))
}
