//! Crypto provider seam.
//!
//! Every primitive the credential layer needs (randomness, SHA-256,
//! HMAC-SHA512, scrypt, AES-256-CBC, secp256k1 ECDSA) goes through the
//! [`CryptoProvider`] trait. [`RustCrypto`] is the production implementation;
//! tests can substitute their own provider through the `*_with` entry points
//! of each module.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use rand_core::{OsRng, RngCore};
use sha2::Sha512;

use crate::cipher::CipherParams;
use crate::error::{CryptoError, Result};
use crate::hash::sha256;

type HmacSha512 = Hmac<Sha512>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Backend for the raw cryptographic primitives.
pub trait CryptoProvider: Send + Sync {
    /// Fills a new buffer of `len` bytes from a cryptographically secure source.
    fn random_bytes(&self, len: usize) -> Result<Vec<u8>>;

    fn sha256(&self, data: &[u8]) -> [u8; 32];

    fn hmac_sha512(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>>;

    /// Constant-time comparison of `tag` against HMAC-SHA512(key, data).
    fn hmac_sha512_verify(&self, key: &[u8], data: &[u8], tag: &[u8]) -> Result<bool>;

    fn scrypt(&self, secret: &[u8], salt: &[u8], params: &CipherParams, len: usize)
        -> Result<Vec<u8>>;

    fn aes256_cbc_encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Fails with `DecryptionFailed` when the PKCS#7 padding does not validate.
    fn aes256_cbc_decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// ES256K signature (SHA-256 of `message`, RFC 6979 nonce, low-S) as 64-byte `r || s`.
    fn ecdsa_sign(&self, private_scalar: &[u8], message: &[u8]) -> Result<Vec<u8>>;

    /// Returns `Ok(false)` for a malformed or non-matching signature and
    /// `InvalidPoint` when the public key itself cannot be parsed.
    fn ecdsa_verify(&self, public_point: &[u8], message: &[u8], signature: &[u8])
        -> Result<bool>;

    /// Expands a 33-byte SEC1 compressed point to its 65-byte uncompressed form.
    fn decompress_point(&self, compressed: &[u8]) -> Result<Vec<u8>>;

    fn is_on_curve(&self, uncompressed: &[u8]) -> bool;

    /// Generates a fresh secp256k1 key as `(private scalar, uncompressed public point)`.
    fn generate_scalar(&self) -> Result<(Vec<u8>, Vec<u8>)>;
}

/// [`CryptoProvider`] backed by the RustCrypto crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCrypto;

impl CryptoProvider for RustCrypto {
    fn random_bytes(&self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| CryptoError::RandomSource(e.to_string()))?;
        Ok(buf)
    }

    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        sha256(data)
    }

    fn hmac_sha512(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        let mut mac = <HmacSha512 as Mac>::new_from_slice(key)
            .map_err(|e| CryptoError::InvalidKeyLength(format!("HMAC key: {}", e)))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn hmac_sha512_verify(&self, key: &[u8], data: &[u8], tag: &[u8]) -> Result<bool> {
        let mut mac = <HmacSha512 as Mac>::new_from_slice(key)
            .map_err(|e| CryptoError::InvalidKeyLength(format!("HMAC key: {}", e)))?;
        mac.update(data);
        Ok(mac.verify_slice(tag).is_ok())
    }

    fn scrypt(
        &self,
        secret: &[u8],
        salt: &[u8],
        params: &CipherParams,
        len: usize,
    ) -> Result<Vec<u8>> {
        let scrypt_params = scrypt::Params::new(params.log_n, params.r, params.p, len)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        let mut out = vec![0u8; len];
        scrypt::scrypt(secret, salt, &scrypt_params, &mut out)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        Ok(out)
    }

    fn aes256_cbc_encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let encryptor = Aes256CbcEnc::new_from_slices(key, iv)
            .map_err(|e| CryptoError::InvalidKeyLength(format!("AES-256-CBC: {}", e)))?;
        Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    fn aes256_cbc_decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let decryptor = Aes256CbcDec::new_from_slices(key, iv)
            .map_err(|e| CryptoError::InvalidKeyLength(format!("AES-256-CBC: {}", e)))?;
        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)
    }

    fn ecdsa_sign(&self, private_scalar: &[u8], message: &[u8]) -> Result<Vec<u8>> {
        let signing_key = SigningKey::from_slice(private_scalar)
            .map_err(|e| CryptoError::Signature(format!("invalid private scalar: {}", e)))?;
        let signature: Signature = signing_key
            .try_sign(message)
            .map_err(|e| CryptoError::Signature(e.to_string()))?;
        Ok(signature.to_bytes().to_vec())
    }

    fn ecdsa_verify(
        &self,
        public_point: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(public_point).map_err(|_| CryptoError::InvalidPoint)?;
        let signature = match Signature::from_slice(signature) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };
        Ok(verifying_key.verify(message, &signature).is_ok())
    }

    fn decompress_point(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        let point = PublicKey::from_sec1_bytes(compressed).map_err(|_| CryptoError::InvalidPoint)?;
        Ok(point.to_encoded_point(false).as_bytes().to_vec())
    }

    fn is_on_curve(&self, uncompressed: &[u8]) -> bool {
        uncompressed.len() == 65
            && uncompressed[0] == 0x04
            && PublicKey::from_sec1_bytes(uncompressed).is_ok()
    }

    fn generate_scalar(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        let signing_key = SigningKey::random(&mut OsRng);
        let public = signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();
        Ok((signing_key.to_bytes().to_vec(), public))
    }
}
