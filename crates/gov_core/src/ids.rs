//! Newtypes for the identifiers threaded through every layer. Deterministic,
//! ASCII-only, strict shapes; no I/O.

use crate::error::GovError;
use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const MAX_ID_LEN: usize = 256;
const HEX64_LEN: usize = 64;
const TOKEN_MAX_LEN: usize = 128;

#[inline]
fn is_ascii_no_nul(s: &str) -> bool {
    !s.as_bytes().iter().any(|&b| b == 0 || b > 0x7F)
}

#[inline]
fn is_valid_sha256(s: &str) -> bool {
    s.len() == HEX64_LEN
        && s.as_bytes()
            .iter()
            .all(|&b| (b'0'..=b'9').contains(&b) || (b'a'..=b'f').contains(&b))
}

/// Token charset shared by node/module/knob/link identifiers:
/// `^[A-Za-z0-9_.:\-]{1,128}$`, ASCII only.
#[inline]
fn is_valid_token(s: &str) -> bool {
    let bs = s.as_bytes();
    let len = bs.len();
    if len == 0 || len > TOKEN_MAX_LEN || !is_ascii_no_nul(s) {
        return false;
    }
    bs.iter().all(|&b| {
        (b'A'..=b'Z').contains(&b)
            || (b'a'..=b'z').contains(&b)
            || (b'0'..=b'9').contains(&b)
            || b == b'_'
            || b == b'.'
            || b == b':'
            || b == b'-'
    })
}

macro_rules! token_newtype {
    ($(#[$m:meta])* $name:ident) => {
        $(#[$m])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(String);

        impl $name {
            #[inline]
            pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }

        impl FromStr for $name {
            type Err = GovError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if !is_valid_token(s) {
                    return Err(GovError::ValidationError {
                        subkind: "bad_token".into(),
                        detail: format!(concat!(stringify!($name), " {:?} is not a valid token"), s),
                    });
                }
                Ok(Self(s.to_owned()))
            }
        }

        impl TryFrom<&str> for $name {
            type Error = GovError;
            #[inline]
            fn try_from(value: &str) -> Result<Self, Self::Error> { value.parse() }
        }

        impl TryFrom<String> for $name {
            type Error = GovError;
            #[inline]
            fn try_from(value: String) -> Result<Self, Self::Error> {
                if !is_valid_token(&value) {
                    return Err(GovError::ValidationError {
                        subkind: "bad_token".into(),
                        detail: format!(concat!(stringify!($name), " {:?} is not a valid token"), value),
                    });
                }
                Ok(Self(value))
            }
        }
    };
}

token_newtype!(
    /// Identifies a topology node (`RootPolicy`, `Module`, or `Rune`).
    NodeId
);
token_newtype!(
    /// Identifies a tunable module — usually also a `NodeId` of kind
    /// `Module`, kept as a distinct newtype so envelope/ledger APIs can't
    /// accidentally accept a rune or root-policy id.
    ModuleId
);
token_newtype!(
    /// Identifies a single knob within a module's `TuningEnvelope`.
    KnobName
);
token_newtype!(
    /// Identifies a `RuneLink` (cross-realm bridge) within a manifest.
    LinkId
);
token_newtype!(
    /// Identifies a capability token declared/required by a module or phase.
    CapToken
);
token_newtype!(
    /// Identifies an evidence tag such as `EXPLICIT_SHADOW_FORECAST_BRIDGE`.
    EvidenceTag
);

/// Monotonic per-process cycle counter. Cycle ids are never reused and are
/// compared numerically, not lexicographically.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CycleId(pub u64);

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl CycleId {
    pub fn next(self) -> CycleId {
        CycleId(self.0 + 1)
    }
}

/// Lowercase 64-hex SHA-256 digest, used for every content-addressed
/// reference (manifest hash, ir_hash, evidence_bundle_hash, tail_hash).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Hash32(String);

impl Hash32 {
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Construct from a hex string known to already be a valid digest
    /// (e.g. the direct output of a SHA-256 hasher). Panics in debug builds
    /// only via `debug_assert!`; production builds trust the caller, mirroring
    /// the teacher's `Sha256` newtype which is only ever built from a hasher
    /// output or a validated parse.
    pub fn from_trusted_hex(hex: String) -> Self {
        debug_assert!(is_valid_sha256(&hex), "Hash32::from_trusted_hex got non-hex input");
        Hash32(hex)
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Hash32 {
    type Err = GovError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_ascii_no_nul(s) || s.len() > MAX_ID_LEN || !is_valid_sha256(s) {
            return Err(GovError::ValidationError {
                subkind: "bad_hash".into(),
                detail: format!("{s:?} is not a lowercase 64-hex sha256 digest"),
            });
        }
        Ok(Hash32(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_accept_charset() {
        for ok in ["A", "a", "9", "_", ".", ":", "-", "asg.pred", "hel.det:v1"] {
            assert!(is_valid_token(ok), "{ok} should be valid");
            let _: NodeId = ok.parse().unwrap();
        }
        for bad in ["", " ", "has space", "emoji\u{1F600}"] {
            assert!(!is_valid_token(bad));
            assert!(bad.parse::<NodeId>().is_err());
        }
    }

    #[test]
    fn hash32_roundtrip() {
        let hex = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcd";
        let h: Hash32 = hex.parse().unwrap();
        assert_eq!(h.as_hex(), hex);
        assert_eq!(format!("{h}"), hex);
        assert!("NOTHEX".parse::<Hash32>().is_err());
    }

    #[test]
    fn cycle_id_is_numeric_not_lexicographic() {
        let a = CycleId(9);
        let b = CycleId(10);
        assert!(a < b);
    }
}
