//! Canonical JSON byte layout and content hashing.
//!
//! - Objects: keys sorted lexicographically (UTF-8 byte order).
//! - Arrays: order preserved — caller is responsible for stable ordering.
//! - Output: compact, no extra spaces, no trailing newline.
//! - Hash: SHA-256 over the canonical bytes, surfaced as `gov_core::Hash32`.

use digest::Digest;
use gov_core::value::CanonValue;
use gov_core::{GovError, Hash32};
use sha2::Sha256;

/// Convert an arbitrary `serde_json::Value` into the closed `CanonValue`
/// domain, rejecting non-finite floats and non-NFC strings.
pub fn to_canon_value(v: &serde_json::Value) -> Result<CanonValue, GovError> {
    CanonValue::try_from(v)
}

/// Canonical JSON bytes for any serializable value, via its `CanonValue`
/// projection. This is the one encoder every persisted artifact goes
/// through — ledger entries, stabilization/effects stores, manifests.
pub fn canonical_bytes<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, GovError> {
    let v = serde_json::to_value(value)
        .map_err(|e| GovError::SerializationFail(e.to_string()))?;
    let canon = to_canon_value(&v)?;
    let mut out = Vec::with_capacity(256);
    write_canon_value(&canon, &mut out);
    Ok(out)
}

/// SHA-256 of the canonical byte form, as a validated `Hash32`.
pub fn hash_canonical<T: serde::Serialize>(value: &T) -> Result<Hash32, GovError> {
    let bytes = canonical_bytes(value)?;
    Ok(sha256_hex_bytes(&bytes))
}

/// SHA-256 of raw bytes (used for evidence-bundle files, tail-hash chaining).
pub fn sha256_hex_bytes(bytes: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    Hash32::from_trusted_hex(hex::encode(digest))
}

fn write_canon_value(v: &CanonValue, out: &mut Vec<u8>) {
    match v {
        CanonValue::Null => out.extend_from_slice(b"null"),
        CanonValue::Bool(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        CanonValue::Int(n) => out.extend_from_slice(n.to_string().as_bytes()),
        CanonValue::UInt(n) => out.extend_from_slice(n.to_string().as_bytes()),
        CanonValue::Float(n) => out.extend_from_slice(format_finite_float(*n).as_bytes()),
        CanonValue::Str(s) => {
            let quoted = serde_json::to_string(s).expect("string serialization cannot fail");
            out.extend_from_slice(quoted.as_bytes());
        }
        CanonValue::Arr(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canon_value(item, out);
            }
            out.push(b']');
        }
        CanonValue::Obj(map) => {
            out.push(b'{');
            for (i, (k, val)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                let quoted_key = serde_json::to_string(k).expect("key serialization cannot fail");
                out.extend_from_slice(quoted_key.as_bytes());
                out.push(b':');
                write_canon_value(val, out);
            }
            out.push(b'}');
        }
    }
}

/// `CanonValue::Float` is constructed only from finite values (the
/// `TryFrom<&serde_json::Value>` boundary rejects NaN/infinity), so this
/// never needs to special-case non-finite output.
fn format_finite_float(n: f64) -> String {
    serde_json::Number::from_f64(n)
        .map(|num| num.to_string())
        .unwrap_or_else(|| n.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn objects_are_sorted_arrays_preserved() {
        let v = json!({
            "b": 1,
            "a": { "y": 1, "x": 2 },
            "arr": [ {"k": 2, "j": 1}, 3, "z" ]
        });
        let canon = to_canon_value(&v).unwrap();
        let mut out = Vec::new();
        write_canon_value(&canon, &mut out);
        let s = String::from_utf8(out).unwrap();
        assert_eq!(
            s,
            r#"{"a":{"x":2,"y":1},"arr":[{"j":1,"k":2},3,"z"],"b":1}"#
        );
    }

    #[test]
    fn no_trailing_newline() {
        let v = json!({"a": 1});
        let canon = to_canon_value(&v).unwrap();
        let mut out = Vec::new();
        write_canon_value(&canon, &mut out);
        assert!(!out.ends_with(b"\n"));
    }

    #[test]
    fn same_structure_same_hash_regardless_of_key_order() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(
            hash_canonical(&a).unwrap().as_hex(),
            hash_canonical(&b).unwrap().as_hex()
        );
    }

    #[test]
    fn non_finite_float_is_serialization_fail_not_panic() {
        #[derive(serde::Serialize)]
        struct Wrap {
            x: f64,
        }
        let err = canonical_bytes(&Wrap { x: f64::NAN }).unwrap_err();
        assert_eq!(err.kind_tag(), "SerializationFail");
    }
}
