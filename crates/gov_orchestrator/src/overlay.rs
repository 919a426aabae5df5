//! The overlay invocation boundary (spec §6: "consumed, not defined here").
//! `OverlayInvoker` is the external-collaborator seam; no concrete
//! subprocess/HTTP implementation lives in this workspace.

use gov_capability::{check_phase_policy, CapabilitySet};
use gov_core::{CapToken, CycleId, GovResult, Phase};
use serde::{Deserialize, Serialize};

/// The fields the core consumes from an overlay manifest (spec §6). Any
/// other field an authoring tool adds is opaque to this engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OverlayManifest {
    pub name: String,
    pub version: String,
    pub phases: Vec<Phase>,
    pub capabilities: Vec<CapToken>,
    pub entrypoint: String,
    pub timeout_ms: u64,
    #[serde(default)]
    pub capabilities_required: Vec<CapToken>,
}

impl OverlayManifest {
    /// Reject at load if any declared capability is forbidden for any phase
    /// the overlay claims to run in (spec §6: "A manifest declaring a
    /// forbidden capability for its phase is rejected at load").
    pub fn check_at_load(&self) -> GovResult<()> {
        let declared = CapabilitySet::from_tokens(self.capabilities.iter().chain(&self.capabilities_required));
        for phase in &self.phases {
            check_phase_policy(*phase, &declared)?;
        }
        Ok(())
    }
}

/// The JSON payload handed to the overlay on stdin.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OverlayInvocation {
    pub cycle_id: CycleId,
    pub phase: Phase,
    pub payload: serde_json::Value,
}

/// The JSON the overlay is expected to return on stdout within
/// `manifest.timeout_ms`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OverlayOutcome {
    pub ok: bool,
    pub payload: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverlayError {
    Timeout,
    NonZeroExit(i32),
    MalformedOutput(String),
}

impl std::fmt::Display for OverlayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayError::Timeout => write!(f, "overlay invocation timed out"),
            OverlayError::NonZeroExit(code) => write!(f, "overlay exited with code {code}"),
            OverlayError::MalformedOutput(detail) => write!(f, "overlay produced malformed output: {detail}"),
        }
    }
}

impl std::error::Error for OverlayError {}

/// The narrow seam the orchestrator calls through at the APPLY/OBSERVE
/// suspension points (spec §6). Subprocess sandboxing and the HTTP
/// entrypoint are out of scope; this trait is only what the core needs to
/// compile and be testable against a fake.
pub trait OverlayInvoker {
    fn invoke(&self, spec: &OverlayInvocation) -> Result<OverlayOutcome, OverlayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_in_open_phase_is_rejected_at_load() {
        let manifest = OverlayManifest {
            name: "demo".into(),
            version: "1".into(),
            phases: vec![Phase::Open],
            capabilities: vec!["exec".parse().unwrap()],
            entrypoint: "demo.run".into(),
            timeout_ms: 1000,
            capabilities_required: vec![],
        };
        assert!(manifest.check_at_load().is_err());
    }

    #[test]
    fn exec_in_ascend_phase_is_accepted() {
        let manifest = OverlayManifest {
            name: "demo".into(),
            version: "1".into(),
            phases: vec![Phase::Ascend],
            capabilities: vec!["exec".parse().unwrap()],
            entrypoint: "demo.run".into(),
            timeout_ms: 1000,
            capabilities_required: vec![],
        };
        assert!(manifest.check_at_load().is_ok());
    }
}
