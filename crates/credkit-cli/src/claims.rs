// Credential subject claims for `credential issue --claim`
//
// Claims are key=value pairs; dots in the key nest objects, so
// `address.addressLocality=Tokyo` becomes { "address": { "addressLocality": "Tokyo" } }.
// Values that parse as JSON numbers or booleans keep that type; everything
// else is a string.

use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

/// Builds a credential subject from claim arguments.
///
/// # Arguments
/// * `args` - Strings of the form "key=value"
/// * `subject_did` - Written to `@id` when given
///
/// # Returns
/// * `Ok(Value)` - The subject object
/// * `Err` - On a malformed claim or conflicting keys
pub fn parse_claims(args: &[String], subject_did: Option<&str>) -> Result<Value> {
    let mut subject = Map::new();

    if let Some(did) = subject_did {
        subject.insert("@id".to_string(), Value::String(did.to_string()));
    }

    for arg in args {
        let (path, value) = split_claim(arg)?;
        insert_claim(&mut subject, path, typed_value(value))?;
    }

    Ok(Value::Object(subject))
}

fn split_claim(arg: &str) -> Result<(&str, &str)> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid claim '{}'. Expected 'key=value'", arg))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("Empty key in claim '{}'", arg));
    }

    Ok((key, value.trim()))
}

fn typed_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

fn insert_claim(subject: &mut Map<String, Value>, path: &str, value: Value) -> Result<()> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(anyhow!(
            "Invalid claim key '{}': empty segment after dot",
            path
        ));
    }

    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| anyhow!("Empty claim key"))?;

    let mut current = subject;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry {
            Value::Object(map) => map,
            _ => {
                return Err(anyhow!(
                    "Cannot nest claim '{}': '{}' is already a scalar value",
                    path,
                    segment
                ))
            }
        };
    }

    if matches!(current.get(*last), Some(Value::Object(_))) {
        return Err(anyhow!(
            "Cannot set claim '{}': '{}' already holds nested claims",
            path,
            last
        ));
    }
    current.insert(last.to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(args: &[&str]) -> Result<Value> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        parse_claims(&args, None)
    }

    #[test]
    fn test_flat_claims() {
        let subject = claims(&["@type=EmailPerson", "email=alice@example.com"]).unwrap();

        assert_eq!(subject["@type"], "EmailPerson");
        assert_eq!(subject["email"], "alice@example.com");
    }

    #[test]
    fn test_subject_did() {
        let subject = parse_claims(&["name=Alice".to_string()], Some("did:unid:test:abc")).unwrap();

        assert_eq!(subject["@id"], "did:unid:test:abc");
        assert_eq!(subject["name"], "Alice");
    }

    #[test]
    fn test_nested_claims() {
        let subject = claims(&[
            "address.@type=PostalAddress",
            "address.addressLocality=Tokyo",
            "address.geo.latitude=35.68",
        ])
        .unwrap();

        assert_eq!(subject["address"]["@type"], "PostalAddress");
        assert_eq!(subject["address"]["addressLocality"], "Tokyo");
        assert_eq!(subject["address"]["geo"]["latitude"], 35.68);
    }

    #[test]
    fn test_typed_values() {
        let subject = claims(&["age=42", "verified=true", "phone=+81-3-0000", "zip=0012"]).unwrap();

        assert_eq!(subject["age"], 42);
        assert_eq!(subject["verified"], true);
        assert_eq!(subject["phone"], "+81-3-0000");
        // Leading zeros are not valid JSON numbers
        assert_eq!(subject["zip"], "0012");
    }

    #[test]
    fn test_value_with_equals_sign() {
        let subject = claims(&["note=a=b"]).unwrap();
        assert_eq!(subject["note"], "a=b");
    }

    #[test]
    fn test_later_claim_overrides_scalar() {
        let subject = claims(&["name=Alice", "name=Bob"]).unwrap();
        assert_eq!(subject["name"], "Bob");
    }

    #[test]
    fn test_missing_equals() {
        let result = claims(&["email"]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Expected 'key=value'"));
    }

    #[test]
    fn test_empty_key() {
        let result = claims(&[" =value"]);
        assert!(result.unwrap_err().to_string().contains("Empty key"));
    }

    #[test]
    fn test_empty_segment() {
        let result = claims(&["address..locality=Tokyo"]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("empty segment after dot"));
    }

    #[test]
    fn test_scalar_then_nested_conflict() {
        let result = claims(&["address=Tokyo", "address.locality=Tokyo"]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("already a scalar value"));
    }

    #[test]
    fn test_nested_then_scalar_conflict() {
        let result = claims(&["address.locality=Tokyo", "address=Tokyo"]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("already holds nested claims"));
    }
}
