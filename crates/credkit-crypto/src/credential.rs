// Credential proof protocol for credkit
//
// Signing embeds a `proof` member carrying a detached JWS over the object as
// it was before the proof was added. Verification strips the proof back off
// and checks the JWS against what remains.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::did::{split_did, VerificationMethod};
use crate::error::{CryptoError, Result};
use crate::jws;
use crate::keys::KeyPair;
use crate::provider::{CryptoProvider, RustCrypto};
use crate::types::{Proof, VerifiedPayload};

/// Name of the member that carries the proof.
pub const PROOF_KEY: &str = "proof";

/// Identity and key used to sign.
#[derive(Debug, Clone, Copy)]
pub struct CredentialSuite<'a> {
    pub did: &'a str,
    pub key_id: &'a str,
    pub key: &'a KeyPair,
}

/// Expected key id and public key used to verify.
#[derive(Debug, Clone, Copy)]
pub struct VerificationSuite<'a> {
    pub key_id: &'a str,
    pub key: &'a KeyPair,
}

/// Current UTC time as `YYYY-MM-DDTHH:mm:ssZ`.
pub fn created_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Signs `object`, stamping the proof with the current time.
pub fn sign(object: &Value, suite: &CredentialSuite<'_>) -> Result<Value> {
    sign_at(object, suite, &created_now())
}

/// Signs `object` with an explicit `created` timestamp.
pub fn sign_at(object: &Value, suite: &CredentialSuite<'_>, created: &str) -> Result<Value> {
    sign_with(&RustCrypto, object, suite, created)
}

/// Adds a `proof` member to `object`.
///
/// This function:
/// 1. Requires a JSON object with no existing `proof` member
/// 2. Computes a detached JWS over the object
/// 3. Builds the proof with `verificationMethod = did#keyId`
/// 4. Returns a copy of the object with the proof inserted
///
/// # Returns
/// `NotAnObject` or `ProofAlreadyPresent` when step 1 fails
pub fn sign_with<P: CryptoProvider + ?Sized>(
    provider: &P,
    object: &Value,
    suite: &CredentialSuite<'_>,
    created: &str,
) -> Result<Value> {
    // Step 1: Shape checks
    let map = object.as_object().ok_or(CryptoError::NotAnObject)?;
    if map.contains_key(PROOF_KEY) {
        return Err(CryptoError::ProofAlreadyPresent);
    }

    // Step 2: Detached JWS over the unsigned object
    let jws = jws::encode_with(provider, object, suite.key)?;

    // Step 3: Proof
    let verification_method = VerificationMethod::new(suite.did, suite.key_id);
    let proof = Proof::new(created.to_string(), verification_method.to_string(), jws);

    // Step 4: Merge
    let mut signed = map.clone();
    signed.insert(PROOF_KEY.to_string(), serde_json::to_value(&proof)?);

    debug!(verification_method = %verification_method, "signed credential");
    Ok(Value::Object(signed))
}

/// Verifies the proof on `object`.
pub fn verify(object: &Value, suite: &VerificationSuite<'_>) -> Result<VerifiedPayload> {
    verify_with(&RustCrypto, object, suite)
}

/// Checks the `proof` member of `object` and returns the object without it.
///
/// # Returns
/// * `MissingProof` if there is no `proof` member
/// * `KeyIdMismatch` if the key id in `verificationMethod` differs from the suite's
/// * Any JWS error from [`jws::verify`]
/// * Otherwise the stripped payload and whether the signature matched
pub fn verify_with<P: CryptoProvider + ?Sized>(
    provider: &P,
    object: &Value,
    suite: &VerificationSuite<'_>,
) -> Result<VerifiedPayload> {
    let map = object.as_object().ok_or(CryptoError::NotAnObject)?;
    let proof_value = map.get(PROOF_KEY).ok_or(CryptoError::MissingProof)?;
    let proof: Proof = serde_json::from_value(proof_value.clone())?;

    let method = split_did(&proof.verification_method)?;
    if method.key_id != suite.key_id {
        warn!(
            expected = suite.key_id,
            found = %method.key_id,
            "proof key id does not match"
        );
        return Err(CryptoError::KeyIdMismatch {
            expected: suite.key_id.to_string(),
            found: method.key_id,
        });
    }

    let payload: Map<String, Value> = map
        .iter()
        .filter(|(k, _)| k.as_str() != PROOF_KEY)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let payload = Value::Object(payload);

    let is_valid = jws::verify_with(provider, &payload, &proof.jws, suite.key)?;
    debug!(did = %method.did, is_valid, "verified credential proof");

    Ok(VerifiedPayload { payload, is_valid })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PRIVATE_HEX: &str = "c739805ab03da62ddbe03390acdf7615640aa6ed31b8f18243f04a572c528edb";
    const PUBLIC_HEX: &str = "0470964532f083f45fe8e8ccea96a22f6018d46a406f583ab226b19283aa605c44851b9274e6a2ce2ad42b4169e37df5f6cb38e81604b3ca2ebe11dd085862b490";
    const DID: &str = "did:unid:test:EiBprXreMiba4loyl3psXm0RsECdtlCiQIjM8G9BtdQplA";

    fn known_key() -> KeyPair {
        KeyPair::new(
            &hex::decode(PUBLIC_HEX).unwrap(),
            &hex::decode(PRIVATE_HEX).unwrap(),
        )
        .unwrap()
    }

    fn credential() -> Value {
        json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiableCredential", "EmailCredentialV1"],
            "issuer": DID,
            "credentialSubject": {"@id": DID, "email": "alice@example.com"}
        })
    }

    #[test]
    fn test_sign_adds_proof() {
        let key = known_key();
        let suite = CredentialSuite {
            did: DID,
            key_id: "signingKey",
            key: &key,
        };

        let signed = sign_at(&credential(), &suite, "2024-01-15T10:30:00Z")
            .expect("signing should succeed");

        let proof = &signed["proof"];
        assert_eq!(proof["type"], "EcdsaSecp256k1Signature2019");
        assert_eq!(proof["proofPurpose"], "authentication");
        assert_eq!(proof["created"], "2024-01-15T10:30:00Z");
        assert_eq!(
            proof["verificationMethod"],
            format!("{}#signingKey", DID)
        );
        assert!(proof["jws"].as_str().unwrap().contains(".."));
        assert_eq!(signed["credentialSubject"], credential()["credentialSubject"]);
    }

    #[test]
    fn test_sign_then_verify() {
        let key = known_key();
        let signed = sign(
            &credential(),
            &CredentialSuite {
                did: DID,
                key_id: "signingKey",
                key: &key,
            },
        )
        .unwrap();

        let verified = verify(
            &signed,
            &VerificationSuite {
                key_id: "signingKey",
                key: &key,
            },
        )
        .expect("verification should succeed");

        assert!(verified.is_valid);
        assert_eq!(verified.payload, credential());
    }

    #[test]
    fn test_verify_with_public_only_key() {
        let key = known_key();
        let public_only = KeyPair::from_jwk(&key.to_jwk(false).unwrap()).unwrap();
        let signed = sign(
            &credential(),
            &CredentialSuite {
                did: DID,
                key_id: "signingKey",
                key: &key,
            },
        )
        .unwrap();

        let verified = verify(
            &signed,
            &VerificationSuite {
                key_id: "signingKey",
                key: &public_only,
            },
        )
        .unwrap();
        assert!(verified.is_valid);
    }

    #[test]
    fn test_tampered_payload_is_invalid() {
        let key = known_key();
        let mut signed = sign(
            &credential(),
            &CredentialSuite {
                did: DID,
                key_id: "signingKey",
                key: &key,
            },
        )
        .unwrap();
        signed["credentialSubject"]["email"] = json!("mallory@example.com");

        let verified = verify(
            &signed,
            &VerificationSuite {
                key_id: "signingKey",
                key: &key,
            },
        )
        .unwrap();
        assert!(!verified.is_valid);
    }

    #[test]
    fn test_key_id_mismatch() {
        let key = known_key();
        let signed = sign(
            &credential(),
            &CredentialSuite {
                did: DID,
                key_id: "signingKey",
                key: &key,
            },
        )
        .unwrap();

        let result = verify(
            &signed,
            &VerificationSuite {
                key_id: "otherKey",
                key: &key,
            },
        );
        assert!(matches!(result, Err(CryptoError::KeyIdMismatch { .. })));
    }

    #[test]
    fn test_wrong_key_is_invalid() {
        let key = known_key();
        let other = KeyPair::generate().unwrap();
        let signed = sign(
            &credential(),
            &CredentialSuite {
                did: DID,
                key_id: "signingKey",
                key: &key,
            },
        )
        .unwrap();

        let verified = verify(
            &signed,
            &VerificationSuite {
                key_id: "signingKey",
                key: &other,
            },
        )
        .unwrap();
        assert!(!verified.is_valid);
    }

    #[test]
    fn test_proof_already_present() {
        let key = known_key();
        let mut object = credential();
        object["proof"] = json!({});

        let result = sign(
            &object,
            &CredentialSuite {
                did: DID,
                key_id: "signingKey",
                key: &key,
            },
        );
        assert!(matches!(result, Err(CryptoError::ProofAlreadyPresent)));
    }

    #[test]
    fn test_missing_proof() {
        let key = known_key();
        let result = verify(
            &credential(),
            &VerificationSuite {
                key_id: "signingKey",
                key: &key,
            },
        );
        assert!(matches!(result, Err(CryptoError::MissingProof)));
    }

    #[test]
    fn test_non_object_is_rejected() {
        let key = known_key();
        let result = sign(
            &json!(["not", "an", "object"]),
            &CredentialSuite {
                did: DID,
                key_id: "signingKey",
                key: &key,
            },
        );
        assert!(matches!(result, Err(CryptoError::NotAnObject)));
    }

    #[test]
    fn test_malformed_verification_method() {
        let key = known_key();
        let mut signed = sign(
            &credential(),
            &CredentialSuite {
                did: DID,
                key_id: "signingKey",
                key: &key,
            },
        )
        .unwrap();
        signed["proof"]["verificationMethod"] = json!(DID);

        let result = verify(
            &signed,
            &VerificationSuite {
                key_id: "signingKey",
                key: &key,
            },
        );
        assert!(matches!(
            result,
            Err(CryptoError::InvalidVerificationMethod(_))
        ));
    }

    #[test]
    fn test_created_now_format() {
        let created = created_now();
        assert_eq!(created.len(), "2024-01-15T10:30:00Z".len());
        assert!(created.ends_with('Z'));
        assert_eq!(&created[10..11], "T");
    }
}
