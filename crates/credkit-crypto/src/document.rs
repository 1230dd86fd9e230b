//! Credential and presentation documents.
//!
//! Incoming JSON is decoded once into [`Document`], a closed set of shapes:
//! a verifiable credential, a verifiable presentation, or something this
//! crate does not recognize. Credential type tags decode into
//! [`CredentialKind`], with unknown tags kept verbatim.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::credential::PROOF_KEY;
use crate::error::{CryptoError, Result};

/// Base JSON-LD context of every credential and presentation.
pub const W3C_CREDENTIALS_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
/// Type tag carried by every credential in addition to its own kind.
pub const VERIFIABLE_CREDENTIAL_TYPE: &str = "VerifiableCredential";
pub const VERIFIABLE_PRESENTATION_TYPE: &str = "VerifiablePresentation";
/// `id` stamped on credentials and presentations issued through the store.
pub const DEFAULT_DOCUMENT_ID: &str = "https://sds.getunid.io/api/v1";

const CONTEXT_BASE: &str = "https://docs.getunid.io/docs/2020/credentials";

/// Logical type of a credential, taken from its `type` array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    Address,
    AlumniOf,
    BirthDate,
    ContactPoint,
    Email,
    Gender,
    Image,
    Name,
    Phone,
    Qualification,
    WorksFor,
    UnidAuth,
    UnidSds,
    Unrecognized(String),
}

impl CredentialKind {
    /// Every kind with a known tag.
    pub fn known() -> [CredentialKind; 13] {
        use CredentialKind::*;
        [
            Address,
            AlumniOf,
            BirthDate,
            ContactPoint,
            Email,
            Gender,
            Image,
            Name,
            Phone,
            Qualification,
            WorksFor,
            UnidAuth,
            UnidSds,
        ]
    }

    /// Decodes a `type` entry.
    pub fn from_tag(tag: &str) -> Self {
        Self::known()
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .unwrap_or_else(|| CredentialKind::Unrecognized(tag.to_string()))
    }

    /// The `type` entry for this kind.
    pub fn tag(&self) -> &str {
        match self {
            CredentialKind::Address => "AddressCredentialV1",
            CredentialKind::AlumniOf => "AlumniOfCredentialV1",
            CredentialKind::BirthDate => "BirthDateCredentialV1",
            CredentialKind::ContactPoint => "ContactPointCredentialV1",
            CredentialKind::Email => "EmailCredentialV1",
            CredentialKind::Gender => "GenderCredentialV1",
            CredentialKind::Image => "ImageCredentialV1",
            CredentialKind::Name => "NameCredentialV1",
            CredentialKind::Phone => "PhoneCredentialV1",
            CredentialKind::Qualification => "QualificationCredentialV1",
            CredentialKind::WorksFor => "WorksForCredentialV1",
            CredentialKind::UnidAuth => "UNiDAuthCredentialV1",
            CredentialKind::UnidSds => "UNiDSDSCredentialV1",
            CredentialKind::Unrecognized(tag) => tag,
        }
    }

    /// JSON-LD context URL published for this kind.
    pub fn context_url(&self) -> Option<String> {
        let suffix = match self {
            CredentialKind::Address => "address",
            CredentialKind::AlumniOf => "alumni",
            CredentialKind::BirthDate => "birth",
            CredentialKind::ContactPoint => "contact",
            CredentialKind::Email => "email",
            CredentialKind::Gender => "gender",
            CredentialKind::Image => "image",
            CredentialKind::Name => "name",
            CredentialKind::Phone => "phone",
            CredentialKind::Qualification => "qualification",
            CredentialKind::WorksFor => "works",
            CredentialKind::UnidAuth | CredentialKind::UnidSds => "internal",
            CredentialKind::Unrecognized(_) => return None,
        };
        Some(format!("{}/{}", CONTEXT_BASE, suffix))
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A decoded credential-layer document.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Credential(VerifiableCredential),
    Presentation(VerifiablePresentation),
    Unrecognized(Value),
}

impl Document {
    /// Classifies a JSON value by the members it carries.
    ///
    /// A credential has `@context`, `type`, `credentialSubject` and `proof`;
    /// a presentation has `@context`, `type`, `verifiableCredential` and
    /// `proof`. Anything else is `Unrecognized`.
    pub fn decode(value: Value) -> Self {
        let Some(map) = value.as_object() else {
            return Document::Unrecognized(value);
        };
        let has = |key: &str| map.contains_key(key);

        if has("@context") && has("type") && has(PROOF_KEY) {
            if has("credentialSubject") {
                return Document::Credential(VerifiableCredential(value));
            }
            if map
                .get("verifiableCredential")
                .map(Value::is_array)
                .unwrap_or(false)
            {
                return Document::Presentation(VerifiablePresentation(value));
            }
        }

        Document::Unrecognized(value)
    }

    pub fn as_value(&self) -> &Value {
        match self {
            Document::Credential(vc) => vc.as_value(),
            Document::Presentation(vp) => vp.as_value(),
            Document::Unrecognized(value) => value,
        }
    }
}

/// Summary of a credential's metadata members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialMetadata {
    /// First context other than the W3C base context
    pub context: String,
    pub kind: CredentialKind,
    pub id: Option<String>,
    pub issuer_did: String,
    pub credential_subject_did: Option<String>,
    pub issuance_date: DateTime<Utc>,
    pub expiration_date: Option<DateTime<Utc>>,
}

/// Summary of a presentation's metadata members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationMetadata {
    pub id: Option<String>,
    pub issuer_did: String,
    pub issuance_date: DateTime<Utc>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub credential_types: Vec<String>,
}

/// A verifiable credential.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiableCredential(Value);

impl VerifiableCredential {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Entries of the `type` array.
    pub fn types(&self) -> Vec<&str> {
        type_tags(&self.0)
    }

    /// The first type tag other than `VerifiableCredential`.
    pub fn kind(&self) -> Option<CredentialKind> {
        self.types()
            .into_iter()
            .find(|t| *t != VERIFIABLE_CREDENTIAL_TYPE)
            .map(CredentialKind::from_tag)
    }

    pub fn credential_subject(&self) -> Option<&Value> {
        self.0.get("credentialSubject")
    }

    pub fn metadata(&self) -> Result<CredentialMetadata> {
        let context = self
            .0
            .get("@context")
            .and_then(Value::as_array)
            .and_then(|contexts| {
                contexts
                    .iter()
                    .filter_map(Value::as_str)
                    .find(|c| *c != W3C_CREDENTIALS_CONTEXT)
            })
            .ok_or_else(|| invalid("credential has no specific @context"))?;

        let kind = self
            .kind()
            .ok_or_else(|| invalid("credential has no specific type"))?;

        Ok(CredentialMetadata {
            context: context.to_string(),
            kind,
            id: string_member(&self.0, "id"),
            issuer_did: string_member(&self.0, "issuer")
                .ok_or_else(|| invalid("credential has no issuer"))?,
            credential_subject_did: self
                .credential_subject()
                .and_then(|s| s.get("@id"))
                .and_then(Value::as_str)
                .map(str::to_string),
            issuance_date: required_date(&self.0, "issuanceDate")?,
            expiration_date: optional_date(&self.0, "expirationDate")?,
        })
    }
}

/// A verifiable presentation holding zero or more credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiablePresentation(Value);

impl VerifiablePresentation {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// The `verifiableCredential` array.
    pub fn credentials(&self) -> &[Value] {
        self.0
            .get("verifiableCredential")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All credentials for which `predicate` holds.
    pub fn filter<F>(&self, predicate: F) -> Vec<&Value>
    where
        F: Fn(&Value) -> bool,
    {
        self.credentials().iter().filter(|vc| predicate(vc)).collect()
    }

    /// The single credential of the given kind, if any.
    ///
    /// # Returns
    /// `NotUnique` if more than one credential carries the tag.
    pub fn select(&self, kind: &CredentialKind) -> Result<Option<&Value>> {
        let mut matches = self.filter(|vc| type_tags(vc).contains(&kind.tag()));
        if matches.len() > 1 {
            return Err(CryptoError::NotUnique(kind.tag().to_string()));
        }
        Ok(matches.pop())
    }

    /// Distinct type tags of the held credentials, `VerifiableCredential` excluded.
    pub fn credential_types(&self) -> Vec<String> {
        let mut types: Vec<String> = Vec::new();
        for vc in self.credentials() {
            for tag in type_tags(vc) {
                if tag != VERIFIABLE_CREDENTIAL_TYPE && !types.iter().any(|t| t == tag) {
                    types.push(tag.to_string());
                }
            }
        }
        types
    }

    pub fn metadata(&self) -> Result<PresentationMetadata> {
        Ok(PresentationMetadata {
            id: string_member(&self.0, "id"),
            issuer_did: string_member(&self.0, "issuer")
                .ok_or_else(|| invalid("presentation has no issuer"))?,
            issuance_date: required_date(&self.0, "issuanceDate")?,
            expiration_date: optional_date(&self.0, "expirationDate")?,
            credential_types: self.credential_types(),
        })
    }
}

/// Builds an unsigned credential of `kind` about `subject`.
///
/// # Arguments
/// * `kind` - Logical type; its tag goes into `type`
/// * `context_url` - Kind-specific JSON-LD context (the kind's default when `None`)
/// * `subject` - The `credentialSubject` object
/// * `issuer` - Issuer DID
/// * `issuance_date` - `YYYY-MM-DDTHH:mm:ssZ`
/// * `expiration_date` - Optional expiry in the same form
pub fn new_credential(
    kind: &CredentialKind,
    context_url: Option<&str>,
    subject: Value,
    issuer: &str,
    issuance_date: &str,
    expiration_date: Option<&str>,
) -> Result<Value> {
    if !subject.is_object() {
        return Err(CryptoError::NotAnObject);
    }

    let context = context_url
        .map(str::to_string)
        .or_else(|| kind.context_url())
        .ok_or_else(|| invalid(&format!("no @context known for '{}'", kind)))?;

    let mut credential = json!({
        "id": DEFAULT_DOCUMENT_ID,
        "issuer": issuer,
        "issuanceDate": issuance_date,
        "@context": [W3C_CREDENTIALS_CONTEXT, context],
        "type": [VERIFIABLE_CREDENTIAL_TYPE, kind.tag()],
        "credentialSubject": subject,
    });
    if let Some(expiration) = expiration_date {
        credential["expirationDate"] = json!(expiration);
    }

    Ok(credential)
}

/// Builds an unsigned presentation over `credentials`.
///
/// # Returns
/// `NotUnique` if two credentials share a type tag.
pub fn new_presentation(
    credentials: Vec<Value>,
    issuer: &str,
    issuance_date: &str,
    expiration_date: Option<&str>,
) -> Result<Value> {
    let mut seen: Vec<&str> = Vec::new();
    for vc in &credentials {
        for tag in type_tags(vc) {
            if tag == VERIFIABLE_CREDENTIAL_TYPE {
                continue;
            }
            if seen.contains(&tag) {
                return Err(CryptoError::NotUnique(tag.to_string()));
            }
            seen.push(tag);
        }
    }

    let mut presentation = Map::new();
    presentation.insert("id".to_string(), json!(DEFAULT_DOCUMENT_ID));
    presentation.insert("issuer".to_string(), json!(issuer));
    presentation.insert("issuanceDate".to_string(), json!(issuance_date));
    if let Some(expiration) = expiration_date {
        presentation.insert("expirationDate".to_string(), json!(expiration));
    }
    presentation.insert("@context".to_string(), json!([W3C_CREDENTIALS_CONTEXT]));
    presentation.insert("type".to_string(), json!([VERIFIABLE_PRESENTATION_TYPE]));
    presentation.insert("verifiableCredential".to_string(), Value::Array(credentials));

    Ok(Value::Object(presentation))
}

fn type_tags(value: &Value) -> Vec<&str> {
    value
        .get("type")
        .and_then(Value::as_array)
        .map(|types| types.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn string_member(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn parse_date(key: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| invalid(&format!("{} '{}' is not a timestamp: {}", key, raw, e)))
}

fn required_date(value: &Value, key: &str) -> Result<DateTime<Utc>> {
    let raw = value
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(&format!("missing {}", key)))?;
    parse_date(key, raw)
}

fn optional_date(value: &Value, key: &str) -> Result<Option<DateTime<Utc>>> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|raw| parse_date(key, raw))
        .transpose()
}

fn invalid(reason: &str) -> CryptoError {
    CryptoError::InvalidDocument(reason.to_string())
}
