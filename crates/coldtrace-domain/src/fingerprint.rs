use crate::error::{DomainError, DomainResult};
use crate::reading::Reading;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Content-address a reading: SHA-256 over its canonical JSON form,
/// lowercase hex.
///
/// Two readings with identical field values always produce the same
/// fingerprint, regardless of how their JSON arrived ordered. The ledger
/// stores this digest so an auditor can later prove a stored reading is the
/// one that raised the alert.
pub fn fingerprint_reading(reading: &Reading) -> DomainResult<String> {
    let value = serde_json::to_value(reading)
        .map_err(|e| DomainError::ValidationError(format!("unserializable reading: {e}")))?;
    Ok(fingerprint_value(&value))
}

/// SHA-256 of the canonical JSON form of an already-parsed value.
pub fn fingerprint_value(value: &Value) -> String {
    hex::encode(Sha256::digest(canonical_json(value).as_bytes()))
}

/// Serialize a JSON value canonically: object keys sorted lexicographically
/// at every nesting level, `,` and `:` separators, no insignificant
/// whitespace.
///
/// Keys are sorted here rather than trusting `serde_json::Map` iteration
/// order, so the digest stays stable even if a dependency enables
/// serde_json's `preserve_order` feature.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::String(s) => write_json_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json_string(key, out);
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
    }
}

// Same escaping serde_json emits, so canonical scalars match its output.
fn write_json_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_json_sorts_keys_at_every_level() {
        let value: Value =
            serde_json::from_str(r#"{"b":{"z":1,"a":2},"a":[{"y":true,"x":null}]}"#).unwrap();
        assert_eq!(
            canonical_json(&value),
            r#"{"a":[{"x":null,"y":true}],"b":{"a":2,"z":1}}"#
        );
    }

    #[test]
    fn canonical_json_has_no_insignificant_whitespace() {
        let value: Value = serde_json::from_str("{ \"a\" : [ 1 , 2 ] }").unwrap();
        assert_eq!(canonical_json(&value), r#"{"a":[1,2]}"#);
    }

    #[test]
    fn canonical_json_escapes_like_serde_json() {
        let value = Value::String("line\nbreak \"quoted\" \u{1}".to_string());
        assert_eq!(canonical_json(&value), serde_json::to_string(&value).unwrap());
    }

    #[test]
    fn canonical_json_preserves_number_rendering() {
        let value: Value = serde_json::from_str(r#"{"t":9.5,"n":-5.0,"i":42}"#).unwrap();
        assert_eq!(canonical_json(&value), r#"{"i":42,"n":-5.0,"t":9.5}"#);
    }

    #[test]
    fn fingerprint_ignores_key_order() {
        let a: Value = serde_json::from_str(r#"{"device_id":"truck-1","temperature_c":9.5}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"temperature_c":9.5,"device_id":"truck-1"}"#).unwrap();
        assert_eq!(fingerprint_value(&a), fingerprint_value(&b));
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let a: Value = serde_json::from_str(r#"{"temperature_c":9.5}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"temperature_c":9.6}"#).unwrap();
        assert_ne!(fingerprint_value(&a), fingerprint_value(&b));
    }

    #[test]
    fn reading_fingerprint_is_lowercase_hex_sha256() {
        let reading: Reading = serde_json::from_str(
            r#"{
                "device_id": "truck-1",
                "timestamp": "2025-06-01T12:30:45Z",
                "temperature_c": 9.5,
                "humidity_percent": 70.0,
                "battery_voltage": 3.9,
                "door_state": "closed"
            }"#,
        )
        .unwrap();

        let fingerprint = fingerprint_reading(&reading).unwrap();
        assert_eq!(fingerprint.len(), 64);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn identical_readings_share_a_fingerprint() {
        let json = r#"{
            "device_id": "truck-1",
            "timestamp": "2025-06-01T12:30:45Z",
            "temperature_c": 9.5,
            "humidity_percent": 70.0,
            "battery_voltage": 3.9,
            "door_state": "open"
        }"#;
        let a: Reading = serde_json::from_str(json).unwrap();
        let b = a.clone();
        assert_eq!(
            fingerprint_reading(&a).unwrap(),
            fingerprint_reading(&b).unwrap()
        );
    }
}
