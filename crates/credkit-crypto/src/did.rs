// DID verification method references for credkit
// A verification method is written `<did>#<keyId>`

use std::fmt;

use crate::error::{CryptoError, Result};

/// A parsed `<did>#<keyId>` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationMethod {
    pub did: String,
    pub key_id: String,
}

impl VerificationMethod {
    pub fn new(did: &str, key_id: &str) -> Self {
        Self {
            did: did.to_string(),
            key_id: key_id.to_string(),
        }
    }
}

impl fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.did, self.key_id)
    }
}

/// Splits a verification method into its DID and key id.
///
/// The input must contain exactly one `#`.
///
/// # Example
/// ```
/// use credkit_crypto::split_did;
///
/// let method = split_did("did:unid:test:EiA#signingKey").unwrap();
/// assert_eq!(method.did, "did:unid:test:EiA");
/// assert_eq!(method.key_id, "signingKey");
/// ```
pub fn split_did(verification_method: &str) -> Result<VerificationMethod> {
    let parts: Vec<&str> = verification_method.split('#').collect();
    if parts.len() != 2 {
        return Err(CryptoError::InvalidVerificationMethod(
            verification_method.to_string(),
        ));
    }

    Ok(VerificationMethod::new(parts[0], parts[1]))
}
