// ES256K signing for credkit
//
// Signatures are 64-byte r || s over SHA-256 of the message, with RFC 6979
// nonces and low-S normalization.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{CryptoError, Result};
use crate::jcs::jcs_canonical_bytes;
use crate::keys::KeyPair;
use crate::provider::{CryptoProvider, RustCrypto};

/// Length of an `r || s` signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// Signs raw message bytes.
///
/// # Returns
/// `PublicKeyOnly` if the key was built from a JWK without a private scalar.
pub fn sign(message: &[u8], key: &KeyPair) -> Result<Vec<u8>> {
    sign_with(&RustCrypto, message, key)
}

pub fn sign_with<P: CryptoProvider + ?Sized>(
    provider: &P,
    message: &[u8],
    key: &KeyPair,
) -> Result<Vec<u8>> {
    if key.is_public_only() {
        return Err(CryptoError::PublicKeyOnly);
    }

    let signature = provider.ecdsa_sign(key.private_key(), message)?;
    debug!(message_len = message.len(), "signed message");
    Ok(signature)
}

/// Verifies a signature over raw message bytes.
///
/// A signature of the wrong length or with an out-of-range scalar is reported
/// as `Ok(false)`.
pub fn verify(message: &[u8], signature: &[u8], key: &KeyPair) -> Result<bool> {
    verify_with(&RustCrypto, message, signature, key)
}

pub fn verify_with<P: CryptoProvider + ?Sized>(
    provider: &P,
    message: &[u8],
    signature: &[u8],
    key: &KeyPair,
) -> Result<bool> {
    if signature.len() != SIGNATURE_LENGTH {
        warn!(
            signature_len = signature.len(),
            "signature has the wrong length"
        );
        return Ok(false);
    }

    let valid = provider.ecdsa_verify(key.public_key(), message, signature)?;
    if !valid {
        warn!("signature verification failed");
    }
    Ok(valid)
}

/// Signs the JCS canonical form of `message`.
pub fn sign_json<T: Serialize>(message: &T, key: &KeyPair) -> Result<Vec<u8>> {
    sign(&jcs_canonical_bytes(message)?, key)
}

/// Verifies a signature produced by [`sign_json`].
pub fn verify_json<T: Serialize>(message: &T, signature: &[u8], key: &KeyPair) -> Result<bool> {
    verify(&jcs_canonical_bytes(message)?, signature, key)
}
