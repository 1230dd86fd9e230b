// Password-based symmetric cipher for credkit
//
// Blob layout: salt(32) || AES-256-CBC/PKCS#7 ciphertext || iv(16).
// The key is scrypt(secret, salt). The scheme is not authenticated; a wrong
// secret is only detected when the PKCS#7 padding fails to validate.

use tracing::{debug, warn};

use crate::encoding::{base64_decode, base64_encode};
use crate::error::{CryptoError, Result};
use crate::provider::{CryptoProvider, RustCrypto};

pub const SALT_LENGTH: usize = 32;
pub const IV_LENGTH: usize = 16;
pub const KEY_LENGTH: usize = 32;
const BLOCK_SIZE: usize = 16;

/// Smallest blob `decrypt` will look at.
pub const MIN_BLOB_LENGTH: usize = SALT_LENGTH + IV_LENGTH;

/// scrypt work factor used to derive the AES key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherParams {
    /// log2 of the CPU/memory cost N
    pub log_n: u8,
    /// Block size parameter
    pub r: u32,
    /// Parallelization parameter
    pub p: u32,
}

impl Default for CipherParams {
    /// N = 2^14, r = 8, p = 1
    fn default() -> Self {
        Self {
            log_n: 14,
            r: 8,
            p: 1,
        }
    }
}

/// Encrypts `content` under `secret` with the default parameters.
pub fn encrypt(content: &[u8], secret: &[u8]) -> Result<Vec<u8>> {
    encrypt_with(&RustCrypto, &CipherParams::default(), content, secret)
}

/// Encrypts `content` under `secret`.
///
/// This function:
/// 1. Draws a fresh 32-byte salt and 16-byte IV
/// 2. Derives a 32-byte key with scrypt(secret, salt)
/// 3. Encrypts with AES-256-CBC and PKCS#7 padding
/// 4. Returns `salt || ciphertext || iv`
pub fn encrypt_with<P: CryptoProvider + ?Sized>(
    provider: &P,
    params: &CipherParams,
    content: &[u8],
    secret: &[u8],
) -> Result<Vec<u8>> {
    // Step 1: Fresh salt and IV
    let salt = provider.random_bytes(SALT_LENGTH)?;
    let iv = provider.random_bytes(IV_LENGTH)?;

    // Step 2: Derive key
    let key = provider.scrypt(secret, &salt, params, KEY_LENGTH)?;

    // Step 3: Encrypt
    let ciphertext = provider.aes256_cbc_encrypt(&key, &iv, content)?;

    // Step 4: Frame the blob
    let mut blob = Vec::with_capacity(SALT_LENGTH + ciphertext.len() + IV_LENGTH);
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&ciphertext);
    blob.extend_from_slice(&iv);

    debug!(
        plaintext_len = content.len(),
        blob_len = blob.len(),
        "encrypted payload"
    );
    Ok(blob)
}

/// Decrypts a blob produced by [`encrypt`] with the default parameters.
pub fn decrypt(blob: &[u8], secret: &[u8]) -> Result<Vec<u8>> {
    decrypt_with(&RustCrypto, &CipherParams::default(), blob, secret)
}

/// Decrypts `salt || ciphertext || iv`.
///
/// # Returns
/// * `TooShort` if the blob is under 48 bytes
/// * `DecryptionFailed` if the ciphertext framing or padding is invalid
pub fn decrypt_with<P: CryptoProvider + ?Sized>(
    provider: &P,
    params: &CipherParams,
    blob: &[u8],
    secret: &[u8],
) -> Result<Vec<u8>> {
    if blob.len() < MIN_BLOB_LENGTH {
        return Err(CryptoError::TooShort {
            actual: blob.len(),
            minimum: MIN_BLOB_LENGTH,
        });
    }

    let (salt, rest) = blob.split_at(SALT_LENGTH);
    let (ciphertext, iv) = rest.split_at(rest.len() - IV_LENGTH);

    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        warn!(
            ciphertext_len = ciphertext.len(),
            "ciphertext is not a whole number of blocks"
        );
        return Err(CryptoError::DecryptionFailed);
    }

    let key = provider.scrypt(secret, salt, params, KEY_LENGTH)?;

    match provider.aes256_cbc_decrypt(&key, iv, ciphertext) {
        Ok(plaintext) => {
            debug!(plaintext_len = plaintext.len(), "decrypted payload");
            Ok(plaintext)
        }
        Err(e) => {
            warn!("padding check failed during decryption");
            Err(e)
        }
    }
}

/// Encrypts and returns the blob as standard base64 text.
pub fn encrypt_to_base64(content: &[u8], secret: &[u8]) -> Result<String> {
    Ok(base64_encode(&encrypt(content, secret)?))
}

/// Decodes a standard base64 blob and decrypts it.
pub fn decrypt_from_base64(encoded: &str, secret: &[u8]) -> Result<Vec<u8>> {
    decrypt(&base64_decode(encoded)?, secret)
}

/// Runs [`encrypt_with`] on the blocking pool so scrypt does not stall the async runtime.
#[cfg(feature = "async")]
pub async fn encrypt_async(
    params: CipherParams,
    content: Vec<u8>,
    secret: Vec<u8>,
) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || encrypt_with(&RustCrypto, &params, &content, &secret))
        .await
        .map_err(|e| CryptoError::BackgroundTask(e.to_string()))?
}

/// Runs [`decrypt_with`] on the blocking pool.
#[cfg(feature = "async")]
pub async fn decrypt_async(params: CipherParams, blob: Vec<u8>, secret: Vec<u8>) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || decrypt_with(&RustCrypto, &params, &blob, &secret))
        .await
        .map_err(|e| CryptoError::BackgroundTask(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low work factor so the unit tests stay fast
    const FAST: CipherParams = CipherParams {
        log_n: 4,
        r: 8,
        p: 1,
    };

    const KNOWN_BLOB: &str =
        "TJWAkEKJ7hAatpmR+CwiJfOJYt/kwKBSzRSm7qhGs760rqPWa5LX9b9oMIQpz+uS0hAZxKYhrDk7fr6zh58yxQ==";

    #[test]
    fn test_known_vector_decrypts() {
        let plaintext = decrypt_from_base64(KNOWN_BLOB, b"secret").expect("decrypt should succeed");
        assert_eq!(plaintext, b"hello");
    }

    #[test]
    fn test_roundtrip_with_fast_params() {
        let blob = encrypt_with(&RustCrypto, &FAST, b"Hello world!", b"s3cret").unwrap();
        assert_eq!(blob.len(), SALT_LENGTH + 16 + IV_LENGTH);

        let plaintext = decrypt_with(&RustCrypto, &FAST, &blob, b"s3cret").unwrap();
        assert_eq!(plaintext, b"Hello world!");
    }

    #[test]
    fn test_empty_content_roundtrips() {
        let blob = encrypt_with(&RustCrypto, &FAST, b"", b"s3cret").unwrap();
        // PKCS#7 always adds a full block for empty input
        assert_eq!(blob.len(), MIN_BLOB_LENGTH + 16);
        assert!(decrypt_with(&RustCrypto, &FAST, &blob, b"s3cret")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_each_encryption_uses_fresh_salt_and_iv() {
        let a = encrypt_with(&RustCrypto, &FAST, b"same", b"s3cret").unwrap();
        let b = encrypt_with(&RustCrypto, &FAST, b"same", b"s3cret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_secret_fails() {
        let blob = decrypt_from_base64(KNOWN_BLOB, b"wrong");
        assert!(matches!(blob, Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn test_short_blob_is_rejected() {
        let result = decrypt_with(&RustCrypto, &FAST, &[0u8; 47], b"s3cret");
        assert!(matches!(
            result,
            Err(CryptoError::TooShort {
                actual: 47,
                minimum: 48
            })
        ));
    }

    #[test]
    fn test_blob_without_ciphertext_fails() {
        let result = decrypt_with(&RustCrypto, &FAST, &[0u8; 48], b"s3cret");
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));

        let result = decrypt_with(&RustCrypto, &FAST, &[0u8; 50], b"s3cret");
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_async_roundtrip() {
        let blob = encrypt_async(FAST, b"offloaded".to_vec(), b"s3cret".to_vec())
            .await
            .expect("encrypt should succeed");
        let plaintext = decrypt_async(FAST, blob, b"s3cret".to_vec())
            .await
            .expect("decrypt should succeed");
        assert_eq!(plaintext, b"offloaded");
    }
}
