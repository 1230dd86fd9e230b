//! Error types for the credkit crypto layer.

/// Every failure the crypto layer reports to its caller.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid key length: {0}")]
    InvalidKeyLength(String),

    #[error("Invalid point: public key is not on the secp256k1 curve")]
    InvalidPoint,

    #[error("Ciphertext too short: {actual} bytes (expected at least {minimum})")]
    TooShort { actual: usize, minimum: usize },

    #[error("Decryption failed: wrong secret or corrupted ciphertext")]
    DecryptionFailed,

    #[error("Malformed JWS: {0}")]
    MalformedJws(String),

    #[error("Unsupported algorithm: '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("JWS profile violation: {0}")]
    ProfileViolation(String),

    #[error("Unexpected payload: detached JWS must have an empty payload segment")]
    UnexpectedPayload,

    #[error("Proof already present: object must not contain a 'proof' member")]
    ProofAlreadyPresent,

    #[error("Missing proof: object has no 'proof' member")]
    MissingProof,

    #[error("Key id mismatch: expected '{expected}', found '{found}'")]
    KeyIdMismatch { expected: String, found: String },

    #[error("Not unique: more than one credential of type '{0}'")]
    NotUnique(String),

    #[error("Commitment mismatch: content does not match the commitment")]
    CommitmentMismatch,

    #[error("Invalid verification method '{0}': expected '<did>#<keyId>'")]
    InvalidVerificationMethod(String),

    #[error("Expected a JSON object")]
    NotAnObject,

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Key pair has no private scalar and can only verify")]
    PublicKeyOnly,

    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Unsupported multihash: {0}")]
    UnsupportedMultihash(String),

    #[error("Random source failure: {0}")]
    RandomSource(String),

    #[error("Background task failed: {0}")]
    BackgroundTask(String),
}

impl From<base64::DecodeError> for CryptoError {
    fn from(e: base64::DecodeError) -> Self {
        CryptoError::InvalidEncoding(format!("base64: {}", e))
    }
}

impl From<hex::FromHexError> for CryptoError {
    fn from(e: hex::FromHexError) -> Self {
        CryptoError::InvalidEncoding(format!("hex: {}", e))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CryptoError>;
