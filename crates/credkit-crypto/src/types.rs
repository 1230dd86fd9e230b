//! Serializable data types shared across the credential layer.
//!
//! These are the JSON shapes that cross the library boundary: JSON Web Keys,
//! published verification keys, and the `proof` member embedded into signed
//! credentials.

use serde::{Deserialize, Serialize};

/// Key type of every JWK this crate produces.
pub const JWK_KTY: &str = "EC";
/// Curve of every JWK this crate produces.
pub const JWK_CRV: &str = "secp256k1";
/// `type` of a published verification key.
pub const VERIFICATION_KEY_TYPE: &str = "EcdsaSecp256k1VerificationKey2019";
/// `type` of an embedded proof.
pub const PROOF_TYPE: &str = "EcdsaSecp256k1Signature2019";
/// `proofPurpose` of an embedded proof.
pub const PROOF_PURPOSE: &str = "authentication";

/// JSON Web Key for a secp256k1 key pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    /// Key type, always "EC"
    pub kty: String,
    /// Curve name, always "secp256k1"
    pub crv: String,
    /// base64url X coordinate (32 bytes)
    pub x: String,
    /// base64url Y coordinate (32 bytes)
    pub y: String,
    /// base64url private scalar, present only for private JWKs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

/// Verification key as published in a DID document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicKeyPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub key_type: String,
    pub jwk: Jwk,
    pub purpose: Vec<String>,
}

/// Hex form of a key pair (65-byte uncompressed public point, 32-byte scalar).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HexKeyPair {
    pub public: String,
    pub private: String,
}

/// The `proof` member of a signed credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    #[serde(rename = "type")]
    pub proof_type: String,
    pub proof_purpose: String,
    /// UTC timestamp, `YYYY-MM-DDTHH:mm:ssZ`
    pub created: String,
    /// `<did>#<keyId>`
    pub verification_method: String,
    /// Detached compact JWS over the object without its proof
    pub jws: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl Proof {
    /// Creates an authentication proof with no optional fields set.
    pub fn new(created: String, verification_method: String, jws: String) -> Self {
        Self {
            proof_type: PROOF_TYPE.to_string(),
            proof_purpose: PROOF_PURPOSE.to_string(),
            created,
            verification_method,
            jws,
            controller: None,
            challenge: None,
            domain: None,
        }
    }
}

/// Outcome of verifying a signed object.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPayload {
    /// The object with its `proof` member removed
    pub payload: serde_json::Value,
    pub is_valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_jwk_omits_d() {
        let jwk = Jwk {
            kty: JWK_KTY.to_string(),
            crv: JWK_CRV.to_string(),
            x: "x".to_string(),
            y: "y".to_string(),
            d: None,
        };

        let json = serde_json::to_string(&jwk).unwrap();
        assert_eq!(json, r#"{"kty":"EC","crv":"secp256k1","x":"x","y":"y"}"#);
    }

    #[test]
    fn test_proof_serialization() {
        let proof = Proof::new(
            "2024-01-15T10:30:00Z".to_string(),
            "did:unid:test#signingKey".to_string(),
            "header..sig".to_string(),
        );

        let json = serde_json::to_string(&proof).unwrap();
        assert!(json.contains("\"type\":\"EcdsaSecp256k1Signature2019\""));
        assert!(json.contains("\"proofPurpose\":\"authentication\""));
        assert!(json.contains("\"verificationMethod\":\"did:unid:test#signingKey\""));
        assert!(!json.contains("challenge"));
    }

    #[test]
    fn test_proof_deserialization_with_optional_fields() {
        let json = r#"{
            "type": "EcdsaSecp256k1Signature2019",
            "proofPurpose": "authentication",
            "created": "2024-01-15T10:30:00Z",
            "verificationMethod": "did:unid:test#signingKey",
            "jws": "header..sig",
            "domain": "example.com"
        }"#;

        let proof: Proof = serde_json::from_str(json).unwrap();
        assert_eq!(proof.domain.as_deref(), Some("example.com"));
        assert_eq!(proof.controller, None);
    }

    #[test]
    fn test_public_key_payload_renames_type() {
        let payload = PublicKeyPayload {
            id: "signingKey".to_string(),
            key_type: VERIFICATION_KEY_TYPE.to_string(),
            jwk: Jwk {
                kty: JWK_KTY.to_string(),
                crv: JWK_CRV.to_string(),
                x: "x".to_string(),
                y: "y".to_string(),
                d: None,
            },
            purpose: vec!["auth".to_string()],
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], VERIFICATION_KEY_TYPE);
        assert_eq!(value["purpose"][0], "auth");
    }
}
