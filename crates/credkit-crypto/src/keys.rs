// secp256k1 key pair handling for credkit
//
// A KeyPair always stores the 65-byte uncompressed public point. A key built
// from a JWK without `d` carries an all-zero scalar and can only verify.

use std::fmt;

use tracing::debug;

use crate::encoding::{base64url_decode, base64url_encode};
use crate::error::{CryptoError, Result};
use crate::provider::{CryptoProvider, RustCrypto};
use crate::types::{HexKeyPair, Jwk, PublicKeyPayload, JWK_CRV, JWK_KTY, VERIFICATION_KEY_TYPE};

pub const PRIVATE_KEY_SIZE: usize = 32;
pub const COMPRESSED_PUBLIC_KEY_SIZE: usize = 33;
pub const UNCOMPRESSED_PUBLIC_KEY_SIZE: usize = 65;
const COORDINATE_SIZE: usize = 32;

/// A secp256k1 key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    public: [u8; UNCOMPRESSED_PUBLIC_KEY_SIZE],
    private: [u8; PRIVATE_KEY_SIZE],
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(self.public))
            .field("private", &"<redacted>")
            .finish()
    }
}

impl KeyPair {
    /// Builds a key pair from raw bytes.
    ///
    /// # Arguments
    /// * `public` - 33-byte compressed or 65-byte uncompressed SEC1 point
    /// * `private` - 32-byte scalar
    ///
    /// # Returns
    /// `InvalidKeyLength` for any other sizes, `InvalidPoint` if a compressed
    /// point cannot be decompressed.
    pub fn new(public: &[u8], private: &[u8]) -> Result<Self> {
        Self::new_with(&RustCrypto, public, private)
    }

    pub fn new_with<P: CryptoProvider + ?Sized>(
        provider: &P,
        public: &[u8],
        private: &[u8],
    ) -> Result<Self> {
        let private: [u8; PRIVATE_KEY_SIZE] = private.try_into().map_err(|_| {
            CryptoError::InvalidKeyLength(format!(
                "private key must be {} bytes, got {}",
                PRIVATE_KEY_SIZE,
                private.len()
            ))
        })?;

        let uncompressed = match public.len() {
            COMPRESSED_PUBLIC_KEY_SIZE => provider.decompress_point(public)?,
            UNCOMPRESSED_PUBLIC_KEY_SIZE => public.to_vec(),
            other => {
                return Err(CryptoError::InvalidKeyLength(format!(
                    "public key must be {} or {} bytes, got {}",
                    COMPRESSED_PUBLIC_KEY_SIZE, UNCOMPRESSED_PUBLIC_KEY_SIZE, other
                )))
            }
        };

        let public: [u8; UNCOMPRESSED_PUBLIC_KEY_SIZE] =
            uncompressed.as_slice().try_into().map_err(|_| {
                CryptoError::InvalidKeyLength(format!(
                    "decompressed public key must be {} bytes, got {}",
                    UNCOMPRESSED_PUBLIC_KEY_SIZE,
                    uncompressed.len()
                ))
            })?;

        if public[0] != 0x04 {
            return Err(CryptoError::InvalidPoint);
        }

        Ok(Self { public, private })
    }

    /// Generates a fresh key pair from the OS random source.
    pub fn generate() -> Result<Self> {
        Self::generate_with(&RustCrypto)
    }

    pub fn generate_with<P: CryptoProvider + ?Sized>(provider: &P) -> Result<Self> {
        let (private, public) = provider.generate_scalar()?;
        debug!("generated secp256k1 key pair");
        Self::new_with(provider, &public, &private)
    }

    /// Builds a key pair from a JWK. A missing `d` yields a public-only key.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        if jwk.kty != JWK_KTY {
            return Err(CryptoError::UnsupportedAlgorithm(format!("kty {}", jwk.kty)));
        }
        if jwk.crv != JWK_CRV {
            return Err(CryptoError::UnsupportedAlgorithm(format!("crv {}", jwk.crv)));
        }

        let x = decode_coordinate("x", &jwk.x)?;
        let y = decode_coordinate("y", &jwk.y)?;

        let private = match &jwk.d {
            Some(d) => base64url_decode(d)?,
            None => vec![0u8; PRIVATE_KEY_SIZE],
        };

        let mut public = Vec::with_capacity(UNCOMPRESSED_PUBLIC_KEY_SIZE);
        public.push(0x04);
        public.extend_from_slice(&x);
        public.extend_from_slice(&y);

        Self::new(&public, &private)
    }

    /// Builds a key pair from its hex form.
    pub fn from_hex(pair: &HexKeyPair) -> Result<Self> {
        Self::new(&hex::decode(&pair.public)?, &hex::decode(&pair.private)?)
    }

    pub fn to_hex(&self) -> HexKeyPair {
        HexKeyPair {
            public: hex::encode(self.public),
            private: hex::encode(self.private),
        }
    }

    /// 65-byte uncompressed public point.
    pub fn public_key(&self) -> &[u8] {
        &self.public
    }

    pub fn private_key(&self) -> &[u8] {
        &self.private
    }

    /// True when the scalar is the all-zero placeholder from a public JWK.
    pub fn is_public_only(&self) -> bool {
        self.private.iter().all(|b| *b == 0)
    }

    pub fn point_x(&self) -> &[u8] {
        &self.public[1..1 + COORDINATE_SIZE]
    }

    pub fn point_y(&self) -> &[u8] {
        &self.public[1 + COORDINATE_SIZE..]
    }

    /// Checks that the public point satisfies y^2 = x^3 + 7 (mod p).
    pub fn validate_point(&self) -> bool {
        self.validate_point_with(&RustCrypto)
    }

    pub fn validate_point_with<P: CryptoProvider + ?Sized>(&self, provider: &P) -> bool {
        provider.is_on_curve(&self.public)
    }

    /// Converts to JWK form, including `d` when `include_private` is set.
    pub fn to_jwk(&self, include_private: bool) -> Result<Jwk> {
        if !self.validate_point() {
            return Err(CryptoError::InvalidPoint);
        }

        Ok(Jwk {
            kty: JWK_KTY.to_string(),
            crv: JWK_CRV.to_string(),
            x: base64url_encode(self.point_x()),
            y: base64url_encode(self.point_y()),
            d: include_private.then(|| base64url_encode(&self.private)),
        })
    }

    /// Packages the public JWK for publication in a DID document.
    pub fn to_public_key(&self, key_id: &str, purposes: &[&str]) -> Result<PublicKeyPayload> {
        Ok(PublicKeyPayload {
            id: key_id.to_string(),
            key_type: VERIFICATION_KEY_TYPE.to_string(),
            jwk: self.to_jwk(false)?,
            purpose: purposes.iter().map(|p| p.to_string()).collect(),
        })
    }
}

fn decode_coordinate(name: &str, encoded: &str) -> Result<Vec<u8>> {
    let bytes = base64url_decode(encoded)?;
    if bytes.len() != COORDINATE_SIZE {
        return Err(CryptoError::InvalidKeyLength(format!(
            "JWK {} must be {} bytes, got {}",
            name,
            COORDINATE_SIZE,
            bytes.len()
        )));
    }
    Ok(bytes)
}
