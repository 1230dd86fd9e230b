// credkit crypto - Cryptographic protocol layer for verifiable credentials

pub mod cipher;
pub mod commitment;
pub mod credential;
pub mod did;
pub mod document;
pub mod encoding;
pub mod error;
pub mod hash;
pub mod hasher;
pub mod jcs;
pub mod jws;
pub mod keys;
pub mod provider;
pub mod signer;
pub mod types;

pub use cipher::{decrypt_from_base64, encrypt_to_base64, CipherParams};
pub use credential::{CredentialSuite, VerificationSuite};
pub use did::{split_did, VerificationMethod};
pub use document::{CredentialKind, Document, VerifiableCredential, VerifiablePresentation};
pub use error::{CryptoError, Result};
pub use hash::sha256_hex;
pub use jcs::jcs_canonical_bytes;
pub use jws::JwsHeader;
pub use keys::KeyPair;
pub use provider::{CryptoProvider, RustCrypto};
pub use types::{HexKeyPair, Jwk, Proof, PublicKeyPayload, VerifiedPayload};
