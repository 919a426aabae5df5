//! Bounded knob-value domains (§3 `KnobSpec`) and the closed `CanonValue`
//! sum type that canonicalization (`gov_io::canon`) is total over.
//!
//! `CanonValue` exists so serialization failure (`GovError::SerializationFail`)
//! is a real, constructible error rather than a panic: anything that cannot
//! be expressed as a `CanonValue` (non-finite floats, non-UTF8 strings) is
//! rejected at the `TryFrom<&serde_json::Value>` boundary, before any byte is
//! written.

use crate::error::GovError;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The kind of value a knob accepts (§3 `KnobSpec.kind`).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum KnobKind {
    Int,
    Float,
    Bool,
    Enum,
    DurationMs,
}

/// Closed bounds for a knob, shaped per `kind`. Unused variants for a given
/// `kind` are a validation error, not a silently-ignored field.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Bounds {
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Bool,
    Enum { allowed: Vec<String> },
    DurationMs { min_ms: u64, max_ms: u64 },
}

impl Bounds {
    pub fn kind(&self) -> KnobKind {
        match self {
            Bounds::Int { .. } => KnobKind::Int,
            Bounds::Float { .. } => KnobKind::Float,
            Bounds::Bool => KnobKind::Bool,
            Bounds::Enum { .. } => KnobKind::Enum,
            Bounds::DurationMs { .. } => KnobKind::DurationMs,
        }
    }

    /// Checked membership test; the single place bounds violations
    /// (`GovError::BoundsViolation`) originate from.
    pub fn contains(&self, v: &KnobValue) -> Result<(), GovError> {
        match (self, v) {
            (Bounds::Int { min, max }, KnobValue::Int(x)) => {
                if x < min || x > max {
                    Err(GovError::BoundsViolation(format!(
                        "int value {x} outside [{min},{max}]"
                    )))
                } else {
                    Ok(())
                }
            }
            (Bounds::Float { min, max }, KnobValue::Float(x)) => {
                if !x.is_finite() {
                    Err(GovError::BoundsViolation("non-finite float".into()))
                } else if x < min || x > max {
                    Err(GovError::BoundsViolation(format!(
                        "float value {x} outside [{min},{max}]"
                    )))
                } else {
                    Ok(())
                }
            }
            (Bounds::Bool, KnobValue::Bool(_)) => Ok(()),
            (Bounds::Enum { allowed }, KnobValue::Enum(s)) => {
                if allowed.iter().any(|a| a == s) {
                    Ok(())
                } else {
                    Err(GovError::BoundsViolation(format!(
                        "enum value {s:?} not in {allowed:?}"
                    )))
                }
            }
            (Bounds::DurationMs { min_ms, max_ms }, KnobValue::DurationMs(ms)) => {
                if ms < min_ms || ms > max_ms {
                    Err(GovError::BoundsViolation(format!(
                        "duration {ms}ms outside [{min_ms},{max_ms}]ms"
                    )))
                } else {
                    Ok(())
                }
            }
            (bounds, value) => Err(GovError::BoundsViolation(format!(
                "value kind {:?} does not match bounds kind {:?}",
                value.kind(),
                bounds.kind()
            ))),
        }
    }
}

/// A concrete knob assignment value.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "value", rename_all = "snake_case"))]
pub enum KnobValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Enum(String),
    DurationMs(u64),
}

impl KnobValue {
    pub fn kind(&self) -> KnobKind {
        match self {
            KnobValue::Int(_) => KnobKind::Int,
            KnobValue::Float(_) => KnobKind::Float,
            KnobValue::Bool(_) => KnobKind::Bool,
            KnobValue::Enum(_) => KnobKind::Enum,
            KnobValue::DurationMs(_) => KnobKind::DurationMs,
        }
    }

    /// Total order key for deterministic candidate identity and
    /// `baseline_signature` computation. Floats are ordered via their
    /// canonical-text representation (see `gov_io::canon`) so that equal
    /// text implies equal key, matching the canonicalizer's notion of
    /// equality.
    pub fn sort_key(&self) -> String {
        match self {
            KnobValue::Int(x) => format!("i:{x}"),
            KnobValue::Float(x) => format!("f:{x}"),
            KnobValue::Bool(b) => format!("b:{b}"),
            KnobValue::Enum(s) => format!("e:{s}"),
            KnobValue::DurationMs(ms) => format!("d:{ms}"),
        }
    }
}

/// Closed value type that canonicalization is a total function over.
///
/// Distinct from `serde_json::Value` in one respect only: it cannot
/// represent a non-finite float. Construction from JSON goes through
/// `TryFrom<&serde_json::Value>`, which is where `SerializationFail`
/// originates for malformed artifacts.
#[derive(Clone, PartialEq, Debug)]
pub enum CanonValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Arr(Vec<CanonValue>),
    /// `BTreeMap` keeps keys sorted as an invariant of construction, which is
    /// exactly the canonicalization rule (§4.1 "recursively sort mapping keys").
    Obj(BTreeMap<String, CanonValue>),
}

impl CanonValue {
    pub fn obj(pairs: impl IntoIterator<Item = (String, CanonValue)>) -> Self {
        CanonValue::Obj(pairs.into_iter().collect())
    }
}

impl TryFrom<&serde_json::Value> for CanonValue {
    type Error = GovError;

    fn try_from(v: &serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value as J;
        Ok(match v {
            J::Null => CanonValue::Null,
            J::Bool(b) => CanonValue::Bool(*b),
            J::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CanonValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    CanonValue::UInt(u)
                } else if let Some(f) = n.as_f64() {
                    if !f.is_finite() {
                        return Err(GovError::SerializationFail(
                            "non-finite float cannot be canonicalized".into(),
                        ));
                    }
                    CanonValue::Float(f)
                } else {
                    return Err(GovError::SerializationFail(format!(
                        "number {n} has no representable form"
                    )));
                }
            }
            J::String(s) => {
                if !is_nfc(s) {
                    return Err(GovError::SerializationFail(format!(
                        "string {s:?} is not NFC-normalized UTF-8"
                    )));
                }
                CanonValue::Str(s.clone())
            }
            J::Array(a) => {
                let mut out = Vec::with_capacity(a.len());
                for item in a {
                    out.push(CanonValue::try_from(item)?);
                }
                CanonValue::Arr(out)
            }
            J::Object(m) => {
                let mut out = BTreeMap::new();
                for (k, v) in m {
                    if !is_nfc(k) {
                        return Err(GovError::SerializationFail(format!(
                            "key {k:?} is not NFC-normalized UTF-8"
                        )));
                    }
                    out.insert(k.clone(), CanonValue::try_from(v)?);
                }
                CanonValue::Obj(out)
            }
        })
    }
}

/// Conformance check, not a transform: reject strings containing combining
/// marks that would change form under NFC normalization. This engine never
/// silently rewrites caller-supplied text.
fn is_nfc(s: &str) -> bool {
    // Combining diacritical marks (U+0300..=U+036F) following a base
    // character indicate a non-precomposed, non-NFC form for the scripts
    // this engine's identifiers and payload strings are expected to use.
    let mut prev_is_base = false;
    for c in s.chars() {
        let is_combining = ('\u{0300}'..='\u{036F}').contains(&c);
        if is_combining && !prev_is_base {
            return false;
        }
        prev_is_base = !is_combining;
    }
    true
}

impl PartialOrd for CanonValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for CanonValue {}

impl Ord for CanonValue {
    fn cmp(&self, other: &Self) -> Ordering {
        // Total order by discriminant rank first, then by payload; only used
        // for deterministic sorting of heterogeneous arrays in tests, never
        // for canonical byte layout (array order is caller-supplied, §4.1).
        fn rank(v: &CanonValue) -> u8 {
            match v {
                CanonValue::Null => 0,
                CanonValue::Bool(_) => 1,
                CanonValue::Int(_) => 2,
                CanonValue::UInt(_) => 3,
                CanonValue::Float(_) => 4,
                CanonValue::Str(_) => 5,
                CanonValue::Arr(_) => 6,
                CanonValue::Obj(_) => 7,
            }
        }
        match (self, other) {
            (CanonValue::Bool(a), CanonValue::Bool(b)) => a.cmp(b),
            (CanonValue::Int(a), CanonValue::Int(b)) => a.cmp(b),
            (CanonValue::UInt(a), CanonValue::UInt(b)) => a.cmp(b),
            (CanonValue::Float(a), CanonValue::Float(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (CanonValue::Str(a), CanonValue::Str(b)) => a.cmp(b),
            (CanonValue::Arr(a), CanonValue::Arr(b)) => a.cmp(b),
            (CanonValue::Obj(a), CanonValue::Obj(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_int_rejects_out_of_range() {
        let b = Bounds::Int { min: 1, max: 8 };
        assert!(b.contains(&KnobValue::Int(4)).is_ok());
        assert!(b.contains(&KnobValue::Int(9)).is_err());
        assert!(b.contains(&KnobValue::Int(0)).is_err());
    }

    #[test]
    fn bounds_kind_mismatch_is_error() {
        let b = Bounds::Bool;
        assert!(b.contains(&KnobValue::Int(1)).is_err());
    }

    #[test]
    fn canon_value_rejects_non_finite_float() {
        let v = serde_json::json!(f64::NAN);
        assert!(CanonValue::try_from(&v).is_err());
        let v = serde_json::json!(f64::INFINITY);
        assert!(CanonValue::try_from(&v).is_err());
    }

    #[test]
    fn canon_value_accepts_nested_object() {
        let v = serde_json::json!({"b": 1, "a": {"y": 1, "x": 2}});
        let c = CanonValue::try_from(&v).unwrap();
        match c {
            CanonValue::Obj(m) => {
                assert_eq!(m.keys().collect::<Vec<_>>(), vec!["a", "b"]);
            }
            _ => panic!("expected object"),
        }
    }
}
