//! Coarse domain enums shared across layers: realms/lanes (topology
//! membrane taxonomy, §3) and invocation phases (§4.4).

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Coarse realm classification of a topology node.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Realm {
    Asgard,
    Hel,
    Midgard,
    Niflheim,
    Muspelheim,
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Realm::Asgard => "ASGARD",
            Realm::Hel => "HEL",
            Realm::Midgard => "MIDGARD",
            Realm::Niflheim => "NIFLHEIM",
            Realm::Muspelheim => "MUSPELHEIM",
        };
        f.write_str(s)
    }
}

/// Fine-grained lane within a realm: `shadow` observes, `forecast` is
/// authoritative, `neutral` is neither.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Lane {
    Forecast,
    Shadow,
    Neutral,
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Lane::Forecast => "forecast",
            Lane::Shadow => "shadow",
            Lane::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

/// An ordered pair of lanes describing permitted data-flow direction across
/// a `RuneLink`, e.g. `neutral->forecast`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LanePair {
    pub from: Lane,
    pub to: Lane,
}

impl LanePair {
    pub const fn new(from: Lane, to: Lane) -> Self {
        LanePair { from, to }
    }

    /// `true` for the one lane pair the spec singles out as requiring an
    /// explicit evidence bridge (§3 invariant 3).
    pub fn is_shadow_to_forecast(&self) -> bool {
        matches!(self.from, Lane::Shadow) && matches!(self.to, Lane::Forecast)
    }
}

impl fmt::Display for LanePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// Phase gating an overlay invocation (§4.4). Exactly one phase applies per
/// invocation; capability allow/deny rules are keyed on it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Phase {
    Open,
    Align,
    Ascend,
    Clear,
    Seal,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Open,
        Phase::Align,
        Phase::Ascend,
        Phase::Clear,
        Phase::Seal,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Open => "OPEN",
            Phase::Align => "ALIGN",
            Phase::Ascend => "ASCEND",
            Phase::Clear => "CLEAR",
            Phase::Seal => "SEAL",
        };
        f.write_str(s)
    }
}

/// Promotion state of a topology node (§3).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PromotionState {
    Shadow,
    Candidate,
    Promoted,
    Deprecated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_to_forecast_detection() {
        let p = LanePair::new(Lane::Shadow, Lane::Forecast);
        assert!(p.is_shadow_to_forecast());
        assert_eq!(p.to_string(), "shadow->forecast");

        let q = LanePair::new(Lane::Neutral, Lane::Forecast);
        assert!(!q.is_shadow_to_forecast());
    }

    #[test]
    fn phase_display_matches_closed_set() {
        assert_eq!(Phase::Ascend.to_string(), "ASCEND");
        assert_eq!(Phase::ALL.len(), 5);
    }
}
