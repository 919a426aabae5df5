//! gov_capability — the capability registry and the phase policy table
//! (C4). Mirrors `vm_core::variables`: policy is declared as data in one
//! place, not scattered per-phase `if`s.

#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use gov_core::{CapToken, GovError, GovResult, Phase};

/// The two disjoint capability sets declared for one phase (spec §4.4).
/// `forbidden` always dominates `allowed` when a capability somehow
/// appears in both — see `PhasePolicyTable::check`.
#[derive(Clone, Debug)]
pub struct PhaseRule {
    pub phase: Phase,
    pub allowed_capabilities: &'static [&'static str],
    pub forbidden_capabilities: &'static [&'static str],
    /// Capabilities a module MUST declare to run in this phase (e.g.
    /// `exec` for ASCEND). Empty for phases with no hard requirement.
    pub required_capabilities: &'static [&'static str],
}

/// The `exec` capability, gated to ASCEND only (spec §4.4: "ASCEND is the
/// only phase where `exec` is allowed").
pub const EXEC_CAP: &str = "exec";
/// External IO capability, forbidden in CLEAR.
pub const EXTERNAL_IO_CAP: &str = "external_io";
/// Any write capability other than the finalization write, forbidden in SEAL.
pub const WRITE_CAP: &str = "write";
pub const FINALIZE_WRITE_CAP: &str = "finalize_write";

/// Static, data-driven table — one row per phase, declared once.
pub const PHASE_POLICY_TABLE: &[PhaseRule] = &[
    PhaseRule {
        phase: Phase::Open,
        allowed_capabilities: &[EXTERNAL_IO_CAP, WRITE_CAP, FINALIZE_WRITE_CAP],
        forbidden_capabilities: &[EXEC_CAP],
        required_capabilities: &[],
    },
    PhaseRule {
        phase: Phase::Align,
        allowed_capabilities: &[EXTERNAL_IO_CAP, WRITE_CAP, FINALIZE_WRITE_CAP],
        forbidden_capabilities: &[EXEC_CAP],
        required_capabilities: &[],
    },
    PhaseRule {
        phase: Phase::Ascend,
        allowed_capabilities: &[EXEC_CAP, EXTERNAL_IO_CAP, WRITE_CAP, FINALIZE_WRITE_CAP],
        forbidden_capabilities: &[],
        required_capabilities: &[EXEC_CAP],
    },
    PhaseRule {
        phase: Phase::Clear,
        allowed_capabilities: &[WRITE_CAP, FINALIZE_WRITE_CAP],
        forbidden_capabilities: &[EXEC_CAP, EXTERNAL_IO_CAP],
        required_capabilities: &[],
    },
    PhaseRule {
        phase: Phase::Seal,
        allowed_capabilities: &[FINALIZE_WRITE_CAP],
        forbidden_capabilities: &[EXEC_CAP, EXTERNAL_IO_CAP, WRITE_CAP],
        required_capabilities: &[],
    },
];

pub fn rule_for(phase: Phase) -> &'static PhaseRule {
    PHASE_POLICY_TABLE
        .iter()
        .find(|r| r.phase == phase)
        .expect("PHASE_POLICY_TABLE declares all five phases")
}

/// A module's declared capability set, as `CapToken`s resolved from its
/// `TuningEnvelope`/`KnobSpec::capability_required` entries plus any
/// process-level capabilities granted at startup.
#[derive(Clone, Debug, Default)]
pub struct CapabilitySet(BTreeSet<String>);

impl CapabilitySet {
    pub fn new() -> Self {
        CapabilitySet(BTreeSet::new())
    }

    pub fn grant(&mut self, cap: impl Into<String>) {
        self.0.insert(cap.into());
    }

    pub fn contains(&self, cap: &CapToken) -> bool {
        self.0.contains(cap.as_str())
    }

    pub fn contains_str(&self, cap: &str) -> bool {
        self.0.contains(cap)
    }

    pub fn from_tokens<'a>(tokens: impl IntoIterator<Item = &'a CapToken>) -> Self {
        let mut set = BTreeSet::new();
        for t in tokens {
            set.insert(t.as_str().to_owned());
        }
        CapabilitySet(set)
    }
}

/// Check a module's declared capabilities against the phase policy.
/// Denylist dominates: a capability present in both `allowed` and
/// `forbidden` for a phase (a table authoring bug) is still rejected.
pub fn check_phase_policy(phase: Phase, declared: &CapabilitySet) -> GovResult<()> {
    let rule = rule_for(phase);

    for cap in &declared.0 {
        if rule.forbidden_capabilities.contains(&cap.as_str()) {
            return Err(GovError::PolicyViolation(format!(
                "capability {cap:?} is forbidden in phase {phase}"
            )));
        }
    }
    for required in rule.required_capabilities {
        if !declared.contains_str(required) {
            return Err(GovError::CapabilityMissing(format!(
                "phase {phase} requires capability {required:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascend_requires_exec() {
        let empty = CapabilitySet::new();
        let err = check_phase_policy(Phase::Ascend, &empty).unwrap_err();
        assert_eq!(err.kind_tag(), "CapabilityMissing");

        let mut with_exec = CapabilitySet::new();
        with_exec.grant(EXEC_CAP);
        assert!(check_phase_policy(Phase::Ascend, &with_exec).is_ok());
    }

    #[test]
    fn exec_is_forbidden_outside_ascend() {
        let mut with_exec = CapabilitySet::new();
        with_exec.grant(EXEC_CAP);
        for phase in [Phase::Open, Phase::Align, Phase::Clear, Phase::Seal] {
            let err = check_phase_policy(phase, &with_exec).unwrap_err();
            assert_eq!(err.kind_tag(), "PolicyViolation");
        }
    }

    #[test]
    fn clear_forbids_external_io() {
        let mut caps = CapabilitySet::new();
        caps.grant(EXTERNAL_IO_CAP);
        assert!(check_phase_policy(Phase::Clear, &caps).is_err());
    }

    #[test]
    fn seal_forbids_non_finalization_writes() {
        let mut caps = CapabilitySet::new();
        caps.grant(WRITE_CAP);
        assert!(check_phase_policy(Phase::Seal, &caps).is_err());

        let mut finalize_only = CapabilitySet::new();
        finalize_only.grant(FINALIZE_WRITE_CAP);
        assert!(check_phase_policy(Phase::Seal, &finalize_only).is_ok());
    }
}
